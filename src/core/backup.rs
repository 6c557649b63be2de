//! Timestamped copies of a registry taken before it is replaced.
//!
//! Backups live under `<stateDir>/backups/<stem>.<timestamp>.json`. Names
//! never collide: a numeric suffix is added when two land in one millisecond.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Filesystem-safe UTC stamp with millisecond precision
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string()
}

pub fn backups_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("backups")
}

fn registry_stem(registry: &Path) -> String {
    registry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "registry".to_string())
}

/// Write `bytes` (the pre-mutation registry) to a fresh backup file.
pub fn backup_registry(
    registry: &Path,
    state_dir: &Path,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let dir = backups_dir(state_dir);
    fs::create_dir_all(&dir).with_context(|| format!("create backups dir: {}", dir.display()))?;

    let base = format!("{}.{}", registry_stem(registry), file_stamp(now));

    for attempt in 0..1000u32 {
        let name = if attempt == 0 {
            format!("{base}.json")
        } else {
            format!("{base}-{attempt}.json")
        };
        let path = dir.join(name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("create backup {}", path.display()));
            }
        };

        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .with_context(|| format!("write backup {}", path.display()))?;

        debug!(backup = %path.display(), "registry backed up");
        return Ok(path);
    }

    anyhow::bail!("no free backup name for {base} in {}", dir.display())
}
