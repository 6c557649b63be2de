//! `swatch mutate` and `swatch rollback`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use owo_colors::Style;
use serde_json::Value;
use tracing::instrument;

use crate::cli::{AppContext, MutateArgs, RollbackArgs};
use crate::core::error::RegistryError;
use crate::core::mutate::{MutateOptions, MutateReport, RollbackOptions, default_undo_path, mutate, rollback};
use crate::core::patch::parse_patch;

fn print_outcome(
    action: &str,
    registry: &Path,
    report: &MutateReport,
    ctx: &AppContext,
)
{
    if ctx.quiet
    {
        return;
    }

    if !report.written
    {
        println!(
            "{} {action} {} ({} undo op(s) computed)",
            ctx.paint("Would", Style::new().yellow()),
            registry.display(),
            report
                .undo
                .len()
        );
        return;
    }

    println!("{} {} → {}", ctx.paint(action, Style::new().green().bold()), registry.display(), report.checksum);
    if let Some(undo) = &report.undo_path
    {
        println!("  undo:   {}", undo.display());
    }
    if let Some(backup) = &report.backup_path
    {
        println!("  backup: {}", backup.display());
    }
}

/// Apply a patch file to the registry.
#[instrument(skip_all, fields(patch = %args.patch.display()))]
pub fn run(
    args: MutateArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let registry = args
        .target
        .resolve(ctx)?;

    let text =
        std::fs::read_to_string(&args.patch).with_context(|| format!("read patch {}", args.patch.display()))?;
    let doc: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", args.patch.display()))?;
    let ops = parse_patch(&doc).map_err(RegistryError::from)?;

    let now = Utc::now();
    let state_dir = ctx
        .settings
        .state_dir_for(&registry);

    let undo_path = match (args.undo, args.no_undo)
    {
        (Some(path), _) => Some(path),
        (None, true) => None,
        (None, false) if ctx.settings.mutate.write_undo => Some(default_undo_path(&state_dir, &registry, now)),
        (None, false) => None,
    };

    let opts = MutateOptions {
        state_dir,
        backup: !args.no_backup && ctx.settings.mutate.backup,
        undo_path,
        patch_label: Some(
            args.patch
                .display()
                .to_string(),
        ),
        now,
        dry_run: ctx.dry_run,
    };

    let report = mutate(&registry, &ops, &opts)?;
    print_outcome("Mutated", &registry, &report, ctx);
    Ok(())
}

/// Apply an undo record to the registry.
#[instrument(skip_all, fields(undo = %args.undo.display()))]
pub fn rollback_run(
    args: RollbackArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let registry = args
        .target
        .resolve(ctx)?;

    let opts = RollbackOptions {
        state_dir: ctx
            .settings
            .state_dir_for(&registry),
        backup: !args.no_backup && ctx.settings.mutate.backup,
        force: args.force,
        now: Utc::now(),
        dry_run: ctx.dry_run,
    };

    let report = rollback(&registry, &args.undo, &opts)?;
    print_outcome("Rolled back", &registry, &report, ctx);
    Ok(())
}
