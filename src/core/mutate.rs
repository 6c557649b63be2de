//! Filepath: src/core/mutate.rs
//! Locked mutation and rollback of a persisted registry.
//!
//! Both operations run the same cycle under the registry's exclusive lock:
//! read, transform, validate, write side records, then commit atomically.
//! Anything that fails before the commit leaves the registry untouched.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::audit::{self, AuditLogEntry, AuditOperation};
use crate::core::backup::{backup_registry, file_stamp};
use crate::core::error::{RegistryError, RegistryResult, Warning, WarningKind};
use crate::core::model::Registry;
use crate::core::patch::{self, Patch, PatchOp};
use crate::core::store;
use crate::infra::io::checksum;
use crate::infra::lock::with_exclusive_lock;
use crate::infra::schema::SchemaSet;

/// Undo file written by `mutate`: the inverse operations plus the checksum
/// the registry must still have for them to apply cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRecord
{
    pub expected_checksum: String,
    pub operations: Patch,
}

#[derive(Debug, Clone)]
pub struct MutateOptions
{
    /// Backups and the audit log go here
    pub state_dir: PathBuf,

    /// Copy the pre-mutation file into `<state_dir>/backups`
    pub backup: bool,

    /// Where to write the undo record; None skips it
    pub undo_path: Option<PathBuf>,

    /// Label of the patch source for the audit log
    pub patch_label: Option<String>,

    pub now: DateTime<Utc>,

    /// Validate and compute the undo, write nothing
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RollbackOptions
{
    pub state_dir: PathBuf,
    pub backup: bool,

    /// Apply even when the registry changed since the mutation
    pub force: bool,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct MutateReport
{
    pub registry: Registry,

    /// Inverse of what was applied (empty for rollbacks)
    pub undo: Patch,
    pub undo_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,

    /// blake3 of the committed file
    pub checksum: String,
    pub written: bool,
    pub warnings: Vec<Warning>,
}

/// Default undo location: `<state_dir>/undo/<stem>.<timestamp>.undo.json`
pub fn default_undo_path(
    state_dir: &Path,
    registry: &Path,
    now: DateTime<Utc>,
) -> PathBuf
{
    let stem = registry
        .file_stem()
        .map(|s| {
            s.to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "registry".to_string());
    state_dir
        .join("undo")
        .join(format!("{stem}.{}.undo.json", file_stamp(now)))
}

/// Result of applying operations to the current file, not yet committed
struct Staged
{
    registry: Registry,
    document: Value,
    bytes: Vec<u8>,
}

fn stage(
    current: &Value,
    ops: &[PatchOp],
    schemas: &SchemaSet,
) -> RegistryResult<Staged>
{
    let patched = patch::apply(current, ops)?;
    let registry = store::validate(&patched, schemas)?;

    // The committed form is the typed serialization, not the raw patched value
    let document = serde_json::to_value(&registry)
        .map_err(|e| RegistryError::Validation { problems: vec![format!("cannot serialize registry: {e}")] })?;
    let bytes = store::to_bytes(&registry)?;

    Ok(Staged { registry, document, bytes })
}

struct Commit<'a>
{
    registry_path: &'a Path,
    state_dir: &'a Path,
    backup: bool,
    now: DateTime<Utc>,
    operation: AuditOperation,
    patch_label: Option<String>,
    undo_path: Option<&'a Path>,
    patch_count: usize,
}

/// Backup (best effort), atomic replace, audit (best effort)
fn commit(
    c: &Commit,
    previous: &[u8],
    staged: &Staged,
    warnings: &mut Vec<Warning>,
) -> RegistryResult<Option<PathBuf>>
{
    let backup_path = if c.backup
    {
        match backup_registry(c.registry_path, c.state_dir, previous, c.now)
        {
            Ok(p) => Some(p),
            Err(e) =>
            {
                warnings.push(Warning::new(WarningKind::BackupFailed, format!("backup skipped: {e:#}")));
                None
            }
        }
    }
    else
    {
        None
    };

    store::write_atomic(c.registry_path, &staged.bytes)?;

    let entry = AuditLogEntry {
        timestamp: c.now,
        operation: c.operation,
        source_path: c
            .registry_path
            .display()
            .to_string(),
        patch_path: c
            .patch_label
            .clone(),
        undo_path: c
            .undo_path
            .map(|p| {
                p.display()
                    .to_string()
            }),
        backup_taken: backup_path.is_some(),
        patch_count: c.patch_count,
    };
    if let Err(e) = audit::append(c.state_dir, &entry)
    {
        warnings.push(Warning::new(WarningKind::AuditFailed, format!("audit entry not recorded: {e:#}")));
    }

    Ok(backup_path)
}

/// Write the undo record, then run `commit`. When the commit fails the
/// record is withdrawn: removed, or its previous contents put back.
fn with_undo_record<T>(
    undo: Option<(&Path, &UndoRecord)>,
    commit: impl FnOnce() -> RegistryResult<T>,
) -> RegistryResult<T>
{
    let Some((path, record)) = undo
    else
    {
        return commit();
    };

    let prior = std::fs::read(path).ok();
    store::write_atomic(path, &store::to_bytes(record)?)?;

    commit().inspect_err(|_| {
        let restored = match &prior
        {
            Some(bytes) => store::write_atomic(path, bytes).map_err(|e| e.to_string()),
            None => std::fs::remove_file(path).map_err(|e| e.to_string()),
        };
        if let Err(e) = restored
        {
            warn!(undo = %path.display(), error = %e, "could not withdraw undo record");
        }
    })
}

/// Apply `ops` to the registry at `registry_path`.
#[instrument(skip(ops, opts), fields(registry = %registry_path.display(), ops = ops.len()))]
pub fn mutate(
    registry_path: &Path,
    ops: &[PatchOp],
    opts: &MutateOptions,
) -> RegistryResult<MutateReport>
{
    let schemas = SchemaSet::new()?;

    with_exclusive_lock(registry_path, || {
        let previous = store::read_bytes(registry_path)?;
        let current = store::parse_document(&previous, registry_path)?;

        let staged = stage(&current, ops, &schemas)?;

        let undo = patch::diff(&staged.document, &current);
        if patch::apply(&staged.document, &undo).ok().as_ref() != Some(&current)
        {
            return Err(RegistryError::Validation {
                problems: vec!["computed undo does not restore the current registry".into()],
            });
        }

        let new_checksum = checksum(&staged.bytes);
        let mut warnings = Vec::new();

        if opts.dry_run
        {
            return Ok(MutateReport {
                registry: staged.registry,
                undo,
                undo_path: None,
                backup_path: None,
                checksum: new_checksum,
                written: false,
                warnings,
            });
        }

        // The undo record must exist before the registry changes
        let record = UndoRecord { expected_checksum: new_checksum.clone(), operations: undo.clone() };
        let backup_path = with_undo_record(
            opts.undo_path
                .as_deref()
                .map(|path| (path, &record)),
            || {
                commit(
                    &Commit {
                        registry_path,
                        state_dir: &opts.state_dir,
                        backup: opts.backup,
                        now: opts.now,
                        operation: AuditOperation::Mutate,
                        patch_label: opts
                            .patch_label
                            .clone(),
                        undo_path: opts
                            .undo_path
                            .as_deref(),
                        patch_count: ops.len(),
                    },
                    &previous,
                    &staged,
                    &mut warnings,
                )
            },
        )?;

        info!(checksum = %new_checksum, undo_ops = undo.len(), "registry mutated");

        Ok(MutateReport {
            registry: staged.registry,
            undo,
            undo_path: opts
                .undo_path
                .clone(),
            backup_path,
            checksum: new_checksum,
            written: true,
            warnings,
        })
    })
}

/// Undo file contents: a full record, or a bare operation array (unchecked)
fn read_undo(path: &Path) -> RegistryResult<(Option<String>, Patch)>
{
    let bytes = store::read_bytes(path)?;
    let doc: Value = serde_json::from_slice(&bytes)
        .map_err(|e| RegistryError::input(format!("{} is not valid JSON: {e}", path.display())))?;

    match &doc
    {
        Value::Array(_) => Ok((None, patch::parse_patch(&doc)?)),
        Value::Object(map) =>
        {
            let expected = map
                .get("expectedChecksum")
                .and_then(Value::as_str)
                .ok_or_else(|| RegistryError::input(format!("{}: missing `expectedChecksum`", path.display())))?;
            let operations = map
                .get("operations")
                .ok_or_else(|| RegistryError::input(format!("{}: missing `operations`", path.display())))?;
            Ok((Some(expected.to_string()), patch::parse_patch(operations)?))
        }
        _ => Err(RegistryError::input(format!(
            "{} must hold an undo record or an operation array",
            path.display()
        ))),
    }
}

/// Apply the undo file at `undo_path` to the registry at `registry_path`.
#[instrument(skip(opts), fields(registry = %registry_path.display(), undo = %undo_path.display()))]
pub fn rollback(
    registry_path: &Path,
    undo_path: &Path,
    opts: &RollbackOptions,
) -> RegistryResult<MutateReport>
{
    let schemas = SchemaSet::new()?;
    let (expected, ops) = read_undo(undo_path)?;

    with_exclusive_lock(registry_path, || {
        let mut warnings = Vec::new();
        let previous = store::read_bytes(registry_path)?;
        let found = checksum(&previous);

        match &expected
        {
            Some(expected) if *expected != found && !opts.force =>
            {
                return Err(RegistryError::Precondition {
                    message: format!(
                        "{} changed since the mutation (expected {expected}, found {found})",
                        registry_path.display()
                    ),
                });
            }
            Some(_) =>
            {}
            None =>
            {
                warnings.push(Warning::new(
                    WarningKind::UncheckedRollback,
                    format!("{} has no expectedChecksum; applying without a precondition", undo_path.display()),
                ));
            }
        }

        let current = store::parse_document(&previous, registry_path)?;
        let staged = stage(&current, &ops, &schemas)?;
        let new_checksum = checksum(&staged.bytes);

        if opts.dry_run
        {
            return Ok(MutateReport {
                registry: staged.registry,
                undo: Vec::new(),
                undo_path: None,
                backup_path: None,
                checksum: new_checksum,
                written: false,
                warnings,
            });
        }

        let backup_path = commit(
            &Commit {
                registry_path,
                state_dir: &opts.state_dir,
                backup: opts.backup,
                now: opts.now,
                operation: AuditOperation::Rollback,
                patch_label: Some(
                    undo_path
                        .display()
                        .to_string(),
                ),
                undo_path: None,
                patch_count: ops.len(),
            },
            &previous,
            &staged,
            &mut warnings,
        )?;

        info!(checksum = %new_checksum, "registry rolled back");

        Ok(MutateReport {
            registry: staged.registry,
            undo: Vec::new(),
            undo_path: None,
            backup_path,
            checksum: new_checksum,
            written: true,
            warnings,
        })
    })
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use anyhow::Result;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::core::audit::{audit_log_path, read_log};

    fn seed(dir: &Path) -> Result<PathBuf>
    {
        let path = dir.join("registry.json");
        let doc = json!({
            "name": "ui",
            "version": "1.0.0",
            "components": [
                {"name": "Button", "sourcePath": "src/Button.tsx", "export": "named",
                 "props": [{"name": "size", "type": {"kind": "primitive", "name": "string"}, "required": true}],
                 "examples": [], "tokensUsed": ["color.primary"]}
            ],
            "tokens": [
                {"category": "color", "name": "primary", "value": "#00f", "kind": "color", "sourceFile": "t.css"}
            ],
            "generatedAt": "2026-01-01T00:00:00Z"
        });
        let registry: Registry = serde_json::from_value(doc)?;
        fs::write(&path, store::to_bytes(&registry)?)?;
        Ok(path)
    }

    fn mutate_opts(dir: &Path) -> MutateOptions
    {
        MutateOptions {
            state_dir: dir.join(".swatch"),
            backup: true,
            undo_path: Some(dir.join("undo.json")),
            patch_label: Some("p.json".into()),
            now: Utc::now(),
            dry_run: false,
        }
    }

    fn rollback_opts(dir: &Path) -> RollbackOptions
    {
        RollbackOptions { state_dir: dir.join(".swatch"), backup: false, force: false, now: Utc::now(), dry_run: false }
    }

    #[test]
    fn mutate_then_rollback_restores_bytes() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = seed(tmp.path())?;
        let before = fs::read(&path)?;

        let ops = vec![
            PatchOp::replace("/components/Button/props/size/required", json!(false)),
            PatchOp::add("/tokens/-", json!({"category": "space", "name": "sm", "value": "4px", "kind": "dimension", "sourceFile": "t.css"})),
        ];
        let report = mutate(&path, &ops, &mutate_opts(tmp.path()))?;
        assert!(report.written);
        assert!(report.backup_path.is_some());
        assert!(!report.registry.components[0].props[0].required);

        let record: UndoRecord = serde_json::from_slice(&fs::read(tmp.path().join("undo.json"))?)?;
        assert_eq!(record.expected_checksum, checksum(&fs::read(&path)?));

        rollback(&path, &tmp.path().join("undo.json"), &rollback_opts(tmp.path()))?;
        assert_eq!(fs::read(&path)?, before);

        let log = read_log(&audit_log_path(&tmp.path().join(".swatch")))?;
        assert_eq!(
            log.iter()
                .map(|e| e.operation)
                .collect::<Vec<_>>(),
            vec![AuditOperation::Mutate, AuditOperation::Rollback]
        );
        Ok(())
    }

    #[test]
    fn failed_patch_leaves_file_untouched() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = seed(tmp.path())?;
        let before = fs::read(&path)?;

        let missing = vec![PatchOp::remove("/components/Nope")];
        let err = mutate(&path, &missing, &mutate_opts(tmp.path())).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let invalid = vec![PatchOp::replace("/components/Button/export", json!("sideways"))];
        let err = mutate(&path, &invalid, &mutate_opts(tmp.path())).unwrap_err();
        assert!(matches!(err, RegistryError::Validation { .. }));

        let duplicate = vec![PatchOp::add("/components/-", json!({
            "name": "Button", "sourcePath": "x.tsx", "export": "named", "props": [], "examples": [], "tokensUsed": []
        }))];
        assert!(mutate(&path, &duplicate, &mutate_opts(tmp.path())).is_err());

        assert_eq!(fs::read(&path)?, before);
        assert!(!tmp.path().join("undo.json").exists());
        assert!(!audit_log_path(&tmp.path().join(".swatch")).exists());
        Ok(())
    }

    #[test]
    fn rollback_refuses_a_changed_registry_unless_forced() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = seed(tmp.path())?;
        let opts = mutate_opts(tmp.path());
        mutate(&path, &[PatchOp::replace("/version", json!("1.1.0"))], &opts)?;
        mutate(
            &path,
            &[PatchOp::replace("/name", json!("other"))],
            &MutateOptions { undo_path: None, ..opts.clone() },
        )?;

        let undo = tmp.path().join("undo.json");
        let err = rollback(&path, &undo, &rollback_opts(tmp.path())).unwrap_err();
        assert_eq!(err.exit_code(), 6);

        let forced = rollback(&path, &undo, &RollbackOptions { force: true, ..rollback_opts(tmp.path()) })?;
        assert_eq!(forced.registry.version, "1.0.0");
        assert_eq!(forced.registry.name, "other");
        Ok(())
    }

    #[test]
    fn bare_arrays_roll_back_with_a_warning() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = seed(tmp.path())?;
        let undo = tmp.path().join("legacy.json");
        fs::write(&undo, r#"[{"op": "replace", "path": "/version", "value": "9.9.9"}]"#)?;

        let report = rollback(&path, &undo, &rollback_opts(tmp.path()))?;
        assert_eq!(report.registry.version, "9.9.9");
        assert_eq!(report.warnings[0].kind, WarningKind::UncheckedRollback);
        Ok(())
    }

    #[test]
    fn failed_commit_withdraws_the_undo_record() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let record = UndoRecord {
            expected_checksum: "blake3:00".into(),
            operations: vec![PatchOp::replace("/version", json!("1.0.0"))],
        };
        let disk_full = || -> RegistryResult<()> {
            Err(RegistryError::io(tmp.path().join("registry.json"), std::io::Error::other("disk full")))
        };

        let fresh = tmp.path().join("undo/fresh.json");
        let err = with_undo_record(Some((fresh.as_path(), &record)), disk_full).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(!fresh.exists());

        // An older record at the same path comes back unchanged
        let reused = tmp.path().join("reused.json");
        fs::write(&reused, b"older record")?;
        assert!(with_undo_record(Some((reused.as_path(), &record)), disk_full).is_err());
        assert_eq!(fs::read(&reused)?, b"older record");

        with_undo_record(Some((fresh.as_path(), &record)), || Ok(()))?;
        let kept: UndoRecord = serde_json::from_slice(&fs::read(&fresh)?)?;
        assert_eq!(kept, record);
        Ok(())
    }

    #[test]
    fn dry_run_writes_nothing() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = seed(tmp.path())?;
        let before = fs::read(&path)?;

        let report = mutate(
            &path,
            &[PatchOp::replace("/version", json!("2.0.0"))],
            &MutateOptions { dry_run: true, ..mutate_opts(tmp.path()) },
        )?;
        assert!(!report.written);
        assert_eq!(report.undo, vec![PatchOp::replace("/version", json!("1.0.0"))]);
        assert_eq!(fs::read(&path)?, before);
        assert!(!tmp.path().join(".swatch").exists());
        Ok(())
    }
}
