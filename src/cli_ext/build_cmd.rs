//! `swatch build` and `swatch preview`.

use anyhow::Result;
use chrono::Utc;
use owo_colors::Style;
use tracing::instrument;

use crate::cli::{AppContext, BuildArgs, PreviewArgs};
use crate::core::build::{BuildOptions, build};
use crate::core::preview::{PreviewOptions, preview};

fn warning_suffix(count: usize) -> String
{
    match count
    {
        0 => String::new(),
        1 => " (1 warning)".to_string(),
        n => format!(" ({n} warnings)"),
    }
}

/// Build the registry described by the config.
#[instrument(skip_all)]
pub fn run(
    args: BuildArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = ctx.config_path(
        args.config
            .as_deref(),
    );
    let opts = BuildOptions { now: Utc::now(), dry_run: ctx.dry_run, output: args.output };
    let report = build(&config, &opts)?;

    if args.json
    {
        println!("{}", serde_json::to_string_pretty(&report.registry)?);
        return Ok(());
    }
    if ctx.quiet
    {
        return Ok(());
    }

    let verb = match (ctx.dry_run, report.written)
    {
        (true, _) => ctx.paint("Would write", Style::new().yellow()),
        (false, true) => ctx.paint("Wrote", Style::new().green().bold()),
        (false, false) => ctx.paint("Unchanged", Style::new().dimmed()),
    };
    println!(
        "{verb} {}: {} components, {} tokens{}",
        report
            .output
            .display(),
        report
            .registry
            .components
            .len(),
        report
            .registry
            .tokens
            .len(),
        warning_suffix(
            report
                .warnings
                .len()
        )
    );

    let truncated = report
        .registry
        .components
        .iter()
        .filter(|c| {
            c.resolution
                .is_truncated()
        })
        .count();
    if truncated > 0
    {
        println!(
            "  {} {truncated} re-export chain(s) truncated",
            ctx.paint("note:", Style::new().yellow())
        );
    }
    Ok(())
}

/// Rebuild in a scratch directory and show what would change.
#[instrument(skip_all)]
pub fn preview_run(
    args: PreviewArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = ctx.config_path(
        args.config
            .as_deref(),
    );
    let report = preview(&config, &PreviewOptions { now: Utc::now(), keep: args.keep })?;

    if args.json
    {
        println!("{}", serde_json::to_string_pretty(&report.changes)?);
    }
    else if !ctx.quiet
    {
        if report.is_clean()
        {
            println!(
                "{} {} is up to date",
                ctx.paint("Clean", Style::new().green()),
                report
                    .baseline
                    .display()
            );
        }
        else
        {
            for line in report
                .unified
                .lines()
            {
                let style = match line
                    .chars()
                    .next()
                {
                    Some('+') => Style::new().green(),
                    Some('-') => Style::new().red(),
                    Some('@') => Style::new().cyan(),
                    _ => Style::new(),
                };
                println!("{}", ctx.paint(line, style));
            }
            println!(
                "{} change(s) against {}{}",
                report
                    .changes
                    .len(),
                report
                    .baseline
                    .display(),
                warning_suffix(
                    report
                        .warnings
                        .len()
                )
            );
        }
        if let Some(kept) = &report.kept
        {
            println!("Candidate kept at {}", kept.display());
        }
    }

    if args.check && !report.is_clean()
    {
        anyhow::bail!(
            "{} is out of date ({} change(s)); run `swatch build`",
            report
                .baseline
                .display(),
            report
                .changes
                .len()
        );
    }
    Ok(())
}
