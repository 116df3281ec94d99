//! Install lock management.
//!
//! Two concurrent runs for the same formula would race on the install
//! prefix, so an exclusive lock keyed by formula name is taken before the
//! pipeline enters its first state.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::InstallError;

/// How old a lock file can be before it's considered stale (2 hours)
const STALE_LOCK_AGE_SECS: u64 = 7200;

/// Check if a lock file is stale (older than STALE_LOCK_AGE_SECS)
fn is_stale_lock(lock_path: &Path) -> bool {
    if let Ok(metadata) = std::fs::metadata(lock_path)
        && let Ok(modified) = metadata.modified()
        && let Ok(age) = std::time::SystemTime::now().duration_since(modified)
    {
        return age.as_secs() > STALE_LOCK_AGE_SECS;
    }
    false
}

/// Acquire an exclusive lock for installs of `name`.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_install_lock(name: &str) -> Result<InstallLock, InstallError> {
    let lock_path = std::env::temp_dir().join(format!("formula-{}.lock", name));

    if lock_path.exists() && is_stale_lock(&lock_path) {
        let _ = std::fs::remove_file(&lock_path);
    }

    let lock_file = File::create(&lock_path)?;

    if lock_file.try_lock_exclusive().is_err() {
        drop(lock_file);
        return Err(InstallError::Locked(name.to_string()));
    }

    Ok(InstallLock {
        _file: lock_file,
        path: lock_path,
    })
}

/// RAII guard for the install lock - releases and deletes the lock file
/// when dropped.
#[derive(Debug)]
pub struct InstallLock {
    _file: File,
    path: PathBuf,
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_acquired_and_released() {
        let name = "formula-lock-test-a";
        {
            let _lock = acquire_install_lock(name).unwrap();
            assert!(std::env::temp_dir().join("formula-formula-lock-test-a.lock").exists());
        }
        assert!(!std::env::temp_dir().join("formula-formula-lock-test-a.lock").exists());
    }

    #[test]
    fn test_concurrent_lock_blocked() {
        let name = "formula-lock-test-b";
        let _lock1 = acquire_install_lock(name).unwrap();
        let lock2 = acquire_install_lock(name);
        assert!(matches!(lock2, Err(InstallError::Locked(_))));
    }

    #[test]
    fn test_distinct_names_do_not_contend() {
        let _a = acquire_install_lock("formula-lock-test-c").unwrap();
        let _b = acquire_install_lock("formula-lock-test-d").unwrap();
    }
}
