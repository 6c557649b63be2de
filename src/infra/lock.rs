//! Per-registry exclusive lock.
//!
//! Writers hold an advisory lock on `<registry>.lock` for the whole
//! read-modify-write cycle. The lock file is never deleted, so two
//! processes can never hold locks on different inodes for the same path.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tracing::debug;

use crate::core::error::{RegistryError, RegistryResult};

/// Sidecar lock path for a registry file
pub fn lock_path(registry: &Path) -> PathBuf
{
    let mut name = registry
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "registry".into());
    name.push(".lock");
    registry.with_file_name(name)
}

/// Run `f` while holding the exclusive lock for `registry`; blocks until free.
pub fn with_exclusive_lock<T>(
    registry: &Path,
    f: impl FnOnce() -> RegistryResult<T>,
) -> RegistryResult<T>
{
    let path = lock_path(registry);
    if let Some(dir) = path.parent()
        && !dir
            .as_os_str()
            .is_empty()
    {
        std::fs::create_dir_all(dir).map_err(|e| RegistryError::Lock { path: path.clone(), source: e })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| RegistryError::Lock { path: path.clone(), source: e })?;

    let mut lock = RwLock::new(file);
    let _guard = lock
        .write()
        .map_err(|e| RegistryError::Lock { path: path.clone(), source: e })?;
    debug!(lock = %path.display(), "acquired registry lock");

    f()
}

#[cfg(test)]
mod tests
{
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn lock_path_is_a_sibling()
    {
        assert_eq!(lock_path(Path::new("out/registry.json")), PathBuf::from("out/registry.json.lock"));
    }

    #[test]
    fn holders_never_overlap()
    {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(tmp.path().join("registry.json"));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    with_exclusive_lock(&registry, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();

        for h in handles
        {
            h.join()
                .unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
