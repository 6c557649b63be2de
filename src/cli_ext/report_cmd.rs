//! `swatch coverage`, `swatch list`, `swatch show`.

use anyhow::{Context, Result};
use owo_colors::Style;
use serde_json::Value;
use tabled::{Table, Tabled};
use tracing::instrument;

use crate::cli::{AppContext, CoverageArgs, ListArgs, OutputFormat, ShowArgs};
use crate::core::coverage::{CoverageReport, coverage, coverage_against};
use crate::core::model::{ComponentDescriptor, TypeExpr};
use crate::core::query::{component, summaries};
use crate::core::store;
use crate::infra::schema::SchemaSet;

#[derive(Tabled)]
struct TokenRow
{
    token: String,
    used_by: String,
}

fn print_coverage_text(
    report: &CoverageReport,
    ctx: &AppContext,
)
{
    let style = if report.coverage >= 80.0
    {
        Style::new().green()
    }
    else if report.coverage >= 50.0
    {
        Style::new().yellow()
    }
    else
    {
        Style::new().red()
    };

    println!(
        "Token coverage: {} ({} of {} used, {} unused)",
        ctx.paint(format!("{:.2}%", report.coverage), style.bold()),
        report.used,
        report.total,
        report.unused
    );
    if !report
        .unused_tokens
        .is_empty()
    {
        println!("Unused: {}", report.unused_tokens.join(", "));
    }
    if !report
        .undocumented
        .is_empty()
    {
        println!("Undocumented components: {}", report.undocumented.join(", "));
    }
    for (name, keys) in &report.unresolved
    {
        println!("{} {name} references unknown {}", ctx.paint("!", Style::new().yellow()), keys.join(", "));
    }
}

#[instrument(skip_all)]
pub fn coverage_run(
    args: CoverageArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let registry_path = args
        .target
        .resolve(ctx)?;
    let registry = store::load(&registry_path, &SchemaSet::new()?)?;

    let report = match &args.tokens
    {
        Some(path) =>
        {
            let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let tree: Value =
                serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))?;
            coverage_against(&tree, &registry)
        }
        None => coverage(&registry),
    };

    match args.format
    {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_coverage_text(&report, ctx),
        OutputFormat::Table =>
        {
            let rows: Vec<TokenRow> = report
                .usage
                .iter()
                .map(|(token, users)| TokenRow {
                    token: token.clone(),
                    used_by: if users.is_empty()
                    {
                        ctx.paint("unused", Style::new().dimmed())
                    }
                    else
                    {
                        users.join(", ")
                    },
                })
                .collect();
            if !rows.is_empty()
            {
                println!("{}", Table::new(rows));
            }
            print_coverage_text(&report, ctx);
        }
    }

    if let Some(min) = args.min
        && report.coverage < min
    {
        anyhow::bail!("token coverage {:.2}% is below the required {min:.2}%", report.coverage);
    }
    Ok(())
}

#[instrument(skip_all)]
pub fn list_run(
    args: ListArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let registry_path = args
        .target
        .resolve(ctx)?;
    let registry = store::load(&registry_path, &SchemaSet::new()?)?;
    let rows = summaries(&registry, args.filter.as_deref());

    match args.format
    {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text =>
        {
            for row in &rows
            {
                println!("{}\t{}", row.name, row.source_path);
            }
        }
        OutputFormat::Table if rows.is_empty() =>
        {
            if !ctx.quiet
            {
                println!("No components");
            }
        }
        OutputFormat::Table => println!("{}", Table::new(rows)),
    }
    Ok(())
}

/// Short, human form of a prop type
fn describe(ty: &TypeExpr) -> String
{
    match ty
    {
        TypeExpr::Primitive { name } => serde_json::to_value(name)
            .ok()
            .and_then(|v| {
                v.as_str()
                    .map(str::to_string)
            })
            .unwrap_or_default(),
        TypeExpr::Union { values } => values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" | "),
        TypeExpr::Object { fields } =>
        {
            let inner: Vec<String> = fields
                .iter()
                .map(|f| format!("{}{}: {}", f.name, if f.required { "" } else { "?" }, describe(&f.ty)))
                .collect();
            format!("{{ {} }}", inner.join("; "))
        }
        TypeExpr::Unknown { raw } => raw
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

fn print_component(
    c: &ComponentDescriptor,
    ctx: &AppContext,
)
{
    println!("{} ({} export, {})", ctx.paint(&c.name, Style::new().cyan().bold()), c.export, c.source_path);
    if !c
        .resolution
        .is_direct()
    {
        println!("  resolution: {}", c.resolution);
    }
    if let Some(doc) = &c.doc
    {
        for line in doc.lines()
        {
            println!("  {line}");
        }
    }

    if !c
        .props
        .is_empty()
    {
        println!("props:");
        for p in &c.props
        {
            let default = p
                .default
                .as_ref()
                .map(|d| format!(" = {d}"))
                .unwrap_or_default();
            println!("  {}{}: {}{default}", p.name, if p.required { "" } else { "?" }, describe(&p.ty));
        }
    }
    if !c
        .tokens_used
        .is_empty()
    {
        println!("tokens: {}", c.tokens_used.join(", "));
    }
    for example in &c.examples
    {
        println!("example:");
        for line in example.lines()
        {
            println!("  {line}");
        }
    }
}

#[instrument(skip_all, fields(name = %args.name))]
pub fn show_run(
    args: ShowArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let registry_path = args
        .target
        .resolve(ctx)?;
    let registry = store::load(&registry_path, &SchemaSet::new()?)?;
    let found = component(&registry, &args.name)?;

    if args.json
    {
        println!("{}", serde_json::to_string_pretty(found)?);
    }
    else
    {
        print_component(found, ctx);
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;
    use crate::core::model::{FieldDescriptor, Primitive};

    #[test]
    fn types_render_compactly()
    {
        assert_eq!(describe(&TypeExpr::Primitive { name: Primitive::Boolean }), "boolean");
        assert_eq!(describe(&TypeExpr::Union { values: vec![json!("sm"), json!("md")] }), r#""sm" | "md""#);
        assert_eq!(
            describe(&TypeExpr::Object {
                fields: vec![FieldDescriptor {
                    name: "x".into(),
                    ty: TypeExpr::Primitive { name: Primitive::Number },
                    required: false,
                }]
            }),
            "{ x?: number }"
        );
        assert_eq!(describe(&TypeExpr::unknown()), "unknown");
    }
}
