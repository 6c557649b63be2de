//! `swatch tokens export` / `swatch tokens import`.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cli::{AppContext, TokensExportArgs, TokensImportArgs};
use crate::core::error::RegistryError;
use crate::core::store;
use crate::core::tokens::{export_tokens, import_tokens, render_css};
use crate::infra::schema::SchemaSet;

/// Write `text` to `output`, or stdout when absent
fn emit(
    text: &str,
    output: Option<&Path>,
    ctx: &AppContext,
) -> Result<()>
{
    match output
    {
        Some(path) if ctx.dry_run =>
        {
            if !ctx.quiet
            {
                println!("Would write {} ({} bytes)", path.display(), text.len());
            }
        }
        Some(path) =>
        {
            store::write_atomic(path, text.as_bytes())?;
            if !ctx.quiet
            {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[instrument(skip_all)]
pub fn export_run(
    args: TokensExportArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let registry_path = args
        .target
        .resolve(ctx)?;
    let registry = store::load(&registry_path, &SchemaSet::new()?)?;

    let doc = export_tokens(&registry.tokens);
    let mut text = serde_json::to_string_pretty(&doc)?;
    text.push('\n');

    debug!(tokens = registry.tokens.len(), "tokens exported");
    emit(&text, args.output.as_deref(), ctx)
}

#[instrument(skip_all, fields(input = %args.input.display()))]
pub fn import_run(
    args: TokensImportArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let text =
        std::fs::read_to_string(&args.input).with_context(|| format!("read {}", args.input.display()))?;
    let doc: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", args.input.display()))?;
    let tokens = import_tokens(&doc).map_err(RegistryError::from)?;

    let rendered = if args.json
    {
        let mut json = serde_json::to_string_pretty(&tokens)?;
        json.push('\n');
        json
    }
    else
    {
        render_css(&tokens)
    };

    debug!(tokens = tokens.len(), "tokens imported");
    emit(&rendered, args.output.as_deref(), ctx)
}
