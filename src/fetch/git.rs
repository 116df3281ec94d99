//! Shallow git checkout for head installs.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use indicatif::ProgressBar;

use crate::descriptor::validate_git_url;
use crate::error::InstallError;
use crate::output;

/// RAII guard for progress bars - ensures cleanup on any exit path
struct ProgressGuard(ProgressBar);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// Shallow-clone `branch` of `url` into `dest_dir/<repo-name>`.
///
/// Only the latest commit is fetched. Returns the checkout path.
pub fn clone_head(url: &str, branch: &str, dest_dir: &Path) -> Result<PathBuf, InstallError> {
    validate_git_url(url)?;

    let repo_name = repo_name(url)?;
    let dest = dest_dir.join(&repo_name);
    let dest_str = dest.to_str().ok_or_else(|| {
        InstallError::MalformedDescriptor("destination path contains invalid UTF-8".into())
    })?;

    output::detail(&format!("git clone --depth 1 --branch {} {}", branch, url));
    let _guard = ProgressGuard(output::spinner(&format!("cloning {}", repo_name)));

    let out = Command::new("git")
        .args([
            "clone",
            "--depth",
            "1",
            "--branch",
            branch,
            "--progress",
            url,
            dest_str,
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| InstallError::Network(format!("failed to run git: {}", e)))?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        let stderr = stderr.trim();
        // git reports a missing repo or branch on stderr; map it to the
        // not-found category rather than a generic transport error.
        if stderr.contains("not found") || stderr.contains("Remote branch") {
            return Err(InstallError::NotFound(format!("{} (branch {})", url, branch)));
        }
        return Err(InstallError::Network(format!(
            "git clone failed for {}: {}",
            url, stderr
        )));
    }

    Ok(dest)
}

/// Extract the repository name from a git URL.
fn repo_name(url: &str) -> Result<String, InstallError> {
    // Strip fragments/queries, trailing slash, and the .git suffix:
    // https://github.com/user/repo.git#x -> repo
    let url = url.split(['#', '?']).next().unwrap_or(url);
    let url = url.trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);

    let path_part = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://"))
        .or_else(|| url.strip_prefix("git@"))
        .unwrap_or(url);

    // Need at least one path segment after the host; a bare domain has none.
    let segments: Vec<&str> = path_part.split(['/', ':']).collect();
    if segments.len() < 2 {
        return Err(InstallError::MalformedDescriptor(format!(
            "git URL has no repository path: {}",
            url
        )));
    }

    segments
        .last()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            InstallError::MalformedDescriptor(format!(
                "cannot extract repository name from URL: {}",
                url
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_name_https() {
        assert_eq!(
            repo_name("https://github.com/dominikwilkowski/beast.git").unwrap(),
            "beast"
        );
        assert_eq!(
            repo_name("https://github.com/dominikwilkowski/beast").unwrap(),
            "beast"
        );
        assert_eq!(
            repo_name("https://github.com/dominikwilkowski/beast/").unwrap(),
            "beast"
        );
    }

    #[test]
    fn test_repo_name_ssh() {
        assert_eq!(repo_name("git@github.com:user/repo.git").unwrap(), "repo");
    }

    #[test]
    fn test_repo_name_strips_fragment_and_query() {
        assert_eq!(
            repo_name("https://github.com/user/repo.git#main").unwrap(),
            "repo"
        );
        assert_eq!(
            repo_name("https://github.com/user/repo.git?token=x").unwrap(),
            "repo"
        );
    }

    #[test]
    fn test_repo_name_bare_domain_rejected() {
        assert!(repo_name("https://example.com").is_err());
        assert!(repo_name("https://example.com/").is_err());
    }
}
