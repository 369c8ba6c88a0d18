use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::global;

/// Exclusive lock over a storage directory, held for the lifetime of a run.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock in `dir`, failing immediately if another process holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(global::lock_file_name());
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        file.try_lock_exclusive().with_context(|| {
            format!(
                "Another meeting-archive run is already using {} (lock: {})",
                dir.display(),
                path.display()
            )
        })?;

        debug!("Acquired instance lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            debug!("Failed to release instance lock: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_lock_fails_until_first_dropped() {
        let dir = TempDir::new().unwrap();

        let first = InstanceLock::acquire(dir.path()).unwrap();
        assert!(first.path().exists());
        assert!(InstanceLock::acquire(dir.path()).is_err());

        drop(first);
        assert!(InstanceLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("transcriptions");
        let _lock = InstanceLock::acquire(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
