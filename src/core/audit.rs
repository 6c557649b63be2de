//! Append-only JSONL audit trail of registry mutations.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation
{
    Mutate,
    Rollback,
}

/// One line of `audit.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry
{
    pub timestamp: DateTime<Utc>,
    pub operation: AuditOperation,
    pub source_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_path: Option<String>,

    pub backup_taken: bool,
    pub patch_count: usize,
}

pub fn audit_log_path(state_dir: &Path) -> PathBuf
{
    state_dir.join("audit.jsonl")
}

/// Append one entry as a single line and flush it to disk
pub fn append(
    state_dir: &Path,
    entry: &AuditLogEntry,
) -> Result<()>
{
    fs::create_dir_all(state_dir).with_context(|| format!("create state dir {}", state_dir.display()))?;

    let path = audit_log_path(state_dir);
    let mut line = serde_json::to_string(entry).context("serialize audit entry")?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open audit log {}", path.display()))?;

    // One write call per line keeps concurrent appends whole
    file.write_all(line.as_bytes())
        .with_context(|| format!("append to {}", path.display()))?;
    file.sync_data()
        .with_context(|| format!("sync {}", path.display()))?;

    Ok(())
}

/// Every entry in the log at `path`; blank lines are skipped
pub fn read_log(path: &Path) -> Result<Vec<AuditLogEntry>>
{
    let file = fs::File::open(path).with_context(|| format!("open audit log {}", path.display()))?;

    BufReader::new(file)
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            line.as_ref()
                .map_or(true, |l| {
                    !l.trim()
                        .is_empty()
                })
        })
        .map(|(n, line)| {
            let line = line.with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&line).with_context(|| format!("{}:{}: bad audit entry", path.display(), n + 1))
        })
        .collect()
}
