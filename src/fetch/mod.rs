//! Acquire phase - downloads pinned artifacts or clones head branches into
//! the run's scratch directory.
//!
//! Transport failures are propagated, never retried here; retries are a
//! caller policy, which keeps a run deterministic and auditable.

mod download;
mod git;

use std::path::{Path, PathBuf};

use crate::descriptor::{ArtifactDescriptor, ArtifactSource};
use crate::error::InstallError;

/// What the fetcher produced in scratch.
#[derive(Debug)]
pub enum Fetched {
    /// Downloaded release archive, awaiting verification.
    Archive(PathBuf),
    /// Checked-out head source tree. There is no archive to verify;
    /// integrity rests on the git transport.
    Tree(PathBuf),
}

/// Fetch the artifact named by `desc` into `scratch`.
pub fn fetch(desc: &ArtifactDescriptor, scratch: &Path) -> Result<Fetched, InstallError> {
    match &desc.source {
        ArtifactSource::Pinned { url, .. } => {
            let dest = scratch.join(url_filename(url));
            download::download(url, &dest)?;
            Ok(Fetched::Archive(dest))
        }
        ArtifactSource::Head(head) => {
            let tree = git::clone_head(&head.repo, &head.branch, scratch)?;
            Ok(Fetched::Tree(tree))
        }
    }
}

/// Extract the filename component of a URL.
pub(crate) fn url_filename(url: &str) -> String {
    url.rsplit('/')
        .next()
        .unwrap_or("download")
        .split('?')
        .next()
        .unwrap_or("download")
        .to_string()
}
