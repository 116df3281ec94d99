//! Per-run build context: a private scratch directory plus the staged
//! install prefix.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Resources owned by exactly one install run.
///
/// The scratch directory is removed when the context drops, on success and
/// on failure alike; the prefix outlives the run.
#[derive(Debug)]
pub struct BuildContext {
    work_dir: TempDir,
    install_prefix: PathBuf,
}

impl BuildContext {
    /// Create the context for one install run. The prefix is created if
    /// absent.
    pub fn create(install_prefix: impl Into<PathBuf>) -> io::Result<Self> {
        let install_prefix = install_prefix.into();
        std::fs::create_dir_all(&install_prefix)?;

        let work_dir = tempfile::Builder::new().prefix("formula-").tempdir()?;

        Ok(Self {
            work_dir,
            install_prefix,
        })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn install_prefix(&self) -> &Path {
        &self.install_prefix
    }
}
