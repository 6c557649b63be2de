//! Mutation, rollback, and the side records they leave behind.

mod util;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde_json::json;

use swatch::core::audit::{AuditOperation, audit_log_path, read_log};
use swatch::core::build::{BuildOptions, build};
use swatch::core::error::RegistryError;
use swatch::core::mutate::{MutateOptions, RollbackOptions, default_undo_path, mutate, rollback};
use swatch::core::patch::PatchOp;

fn built() -> Result<(assert_fs::TempDir, PathBuf)>
{
    let tmp = util::design_system();
    build(&tmp.path().join("swatch.json"), &BuildOptions::default())?;
    let registry = tmp.path().join("registry.json");
    Ok((tmp, registry))
}

fn mutate_opts(state: &Path, registry: &Path) -> MutateOptions
{
    let now = Utc::now();
    MutateOptions {
        state_dir: state.to_path_buf(),
        backup: true,
        undo_path: Some(default_undo_path(state, registry, now)),
        patch_label: Some("test".into()),
        now,
        dry_run: false,
    }
}

fn rollback_opts(state: &Path) -> RollbackOptions
{
    RollbackOptions { state_dir: state.to_path_buf(), backup: true, force: false, now: Utc::now(), dry_run: false }
}

#[test]
fn rollback_restores_the_exact_bytes() -> Result<()>
{
    let (tmp, registry) = built()?;
    let state = tmp.path().join(".swatch");
    let original = fs::read(&registry)?;

    let ops = vec![
        PatchOp::replace("/components/Button/doc", json!("Rewritten.")),
        PatchOp::add("/tokens/-", json!({
            "category": "color", "name": "accent", "value": "#ff00aa", "kind": "color", "sourceFile": "manual"
        })),
    ];
    let report = mutate(&registry, &ops, &mutate_opts(&state, &registry))?;
    assert!(report.written);
    assert_ne!(fs::read(&registry)?, original);

    let undo = report
        .undo_path
        .expect("undo path");
    assert!(undo.exists());
    assert!(
        report
            .backup_path
            .expect("backup")
            .exists()
    );

    rollback(&registry, &undo, &rollback_opts(&state))?;
    assert_eq!(fs::read(&registry)?, original);

    let log = read_log(&audit_log_path(&state))?;
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].operation, AuditOperation::Mutate);
    assert_eq!(log[0].patch_count, 2);
    assert_eq!(log[1].operation, AuditOperation::Rollback);
    Ok(())
}

#[test]
fn rollback_refuses_a_registry_that_moved_on() -> Result<()>
{
    let (tmp, registry) = built()?;
    let state = tmp.path().join(".swatch");

    let first = mutate(&registry, &[PatchOp::replace("/version", json!("2.1.0"))], &mutate_opts(&state, &registry))?;
    let undo = first
        .undo_path
        .expect("undo path");

    let mut second_opts = mutate_opts(&state, &registry);
    second_opts.undo_path = None;
    mutate(&registry, &[PatchOp::replace("/name", json!("acme-next"))], &second_opts)?;
    let before = fs::read(&registry)?;

    let err = rollback(&registry, &undo, &rollback_opts(&state)).unwrap_err();
    assert!(matches!(err, RegistryError::Precondition { .. }));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(fs::read(&registry)?, before);

    let forced = rollback(&registry, &undo, &RollbackOptions { force: true, ..rollback_opts(&state) })?;
    assert_eq!(forced.registry.version, "2.0.0");
    assert_eq!(forced.registry.name, "acme-next");
    Ok(())
}

#[test]
fn failed_mutations_leave_the_file_untouched() -> Result<()>
{
    let (tmp, registry) = built()?;
    let state = tmp.path().join(".swatch");
    let original = fs::read(&registry)?;

    let unresolved = mutate(&registry, &[PatchOp::remove("/components/Ghost")], &mutate_opts(&state, &registry))
        .unwrap_err();
    assert_eq!(unresolved.exit_code(), 2);

    let invalid = mutate(&registry, &[PatchOp::remove("/name")], &mutate_opts(&state, &registry)).unwrap_err();
    assert!(matches!(invalid, RegistryError::Validation { .. }));
    assert_eq!(invalid.exit_code(), 4);

    let duplicate = mutate(
        &registry,
        &[PatchOp::add("/components/-", json!({"name": "Card", "sourcePath": "x.tsx", "export": "named"}))],
        &mutate_opts(&state, &registry),
    )
    .unwrap_err();
    assert_eq!(duplicate.exit_code(), 4);

    assert_eq!(fs::read(&registry)?, original);
    assert!(!audit_log_path(&state).exists());
    Ok(())
}

#[test]
fn concurrent_mutations_are_serialized() -> Result<()>
{
    let (tmp, registry) = built()?;
    let state = tmp.path().join(".swatch");
    let before = swatch::core::store::load(&registry, &swatch::infra::SchemaSet::new()?)?
        .tokens
        .len();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let registry = registry.clone();
                let state = state.clone();
                s.spawn(move || {
                    let token = json!({
                        "category": "space", "name": format!("extra{i}"), "value": format!("{i}px"),
                        "kind": "dimension", "sourceFile": "manual"
                    });
                    let mut opts = mutate_opts(&state, &registry);
                    opts.undo_path = None;
                    mutate(&registry, &[PatchOp::add("/tokens/-", token)], &opts)
                })
            })
            .collect();
        for h in handles
        {
            h.join()
                .expect("thread")
                .expect("mutation");
        }
    });

    let after = swatch::core::store::load(&registry, &swatch::infra::SchemaSet::new()?)?;
    assert_eq!(after.tokens.len(), before + 6);
    assert_eq!(read_log(&audit_log_path(&state))?.len(), 6);
    Ok(())
}

#[test]
fn dry_run_computes_without_writing() -> Result<()>
{
    let (tmp, registry) = built()?;
    let state = tmp.path().join(".swatch");
    let original = fs::read(&registry)?;

    let mut opts = mutate_opts(&state, &registry);
    opts.dry_run = true;
    let report = mutate(&registry, &[PatchOp::replace("/version", json!("9.9.9"))], &opts)?;

    assert!(!report.written);
    assert_eq!(report.undo, vec![PatchOp::replace("/version", json!("2.0.0"))]);
    assert_eq!(fs::read(&registry)?, original);
    assert!(!state.exists());
    Ok(())
}
