//! Formula data model - static records describing what to fetch, how to
//! verify it, and how to build it.
//!
//! A formula file is declarative TOML. The repeated per-version blocks of
//! a formula's history live in one `[versions]` table keyed by version
//! identifier; each entry's checksum is independently authoritative.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;

use crate::error::InstallError;

/// Checksum algorithms accepted in formula files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
}

impl ChecksumAlgorithm {
    /// Length of a hex digest for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// One pinned release artifact: exact URL plus its digest.
#[derive(Debug, Clone, Deserialize)]
pub struct PinnedSource {
    pub url: String,
    pub sha256: String,
}

/// Head source reference: a live branch with reduced integrity guarantees.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadRef {
    pub repo: String,
    pub branch: String,
}

/// Build toolchains a formula may name.
///
/// Each toolchain maps to a fixed command and argument shape. Formula text
/// never reaches a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    Cargo,
}

impl Toolchain {
    /// The single build-and-install command for this toolchain, installing
    /// into `prefix`.
    pub fn argv(&self, prefix: &Path) -> (&'static str, Vec<OsString>) {
        match self {
            Self::Cargo => (
                "cargo",
                vec![
                    OsString::from("install"),
                    OsString::from("--locked"),
                    OsString::from("--root"),
                    prefix.as_os_str().to_os_string(),
                    OsString::from("--path"),
                    OsString::from("."),
                ],
            ),
        }
    }
}

/// How a formula is built: which toolchain, and where in the source tree.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSpec {
    pub toolchain: Toolchain,
    /// Subdirectory of the unpacked source tree to build in.
    #[serde(default)]
    pub subdir: Option<String>,
}

/// A parsed formula file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub license: String,
    #[serde(default, rename = "build-deps")]
    pub build_deps: Vec<String>,
    pub build: BuildSpec,
    #[serde(default)]
    pub head: Option<HeadRef>,
    #[serde(default)]
    pub versions: BTreeMap<String, PinnedSource>,
}

/// Selects between the two artifact sources a formula may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Pinned,
    Head,
}

/// The trust anchor for one install run.
///
/// Exactly one source is active per run; the enum makes the invariant
/// unrepresentable to violate.
#[derive(Debug, Clone)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub license: String,
    pub source: ArtifactSource,
}

#[derive(Debug, Clone)]
pub enum ArtifactSource {
    Pinned {
        version: String,
        url: String,
        checksum: String,
        algorithm: ChecksumAlgorithm,
    },
    Head(HeadRef),
}

impl Formula {
    /// Parse a formula from TOML text.
    pub fn parse(text: &str) -> Result<Self, InstallError> {
        toml::from_str(text).map_err(|e| InstallError::MalformedDescriptor(e.to_string()))
    }

    /// Pick a pinned version: the requested one, else the highest released.
    pub fn select_version(
        &self,
        requested: Option<&str>,
    ) -> Result<(&str, &PinnedSource), InstallError> {
        if let Some(version) = requested {
            return self
                .versions
                .get_key_value(version)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| {
                    InstallError::MalformedDescriptor(format!(
                        "formula '{}' has no version '{}'",
                        self.name, version
                    ))
                });
        }

        // Highest semver wins; keys that don't parse as semver rank lowest.
        self.versions
            .iter()
            .max_by_key(|(k, _)| semver::Version::parse(k).ok())
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| {
                InstallError::MalformedDescriptor(format!(
                    "formula '{}' has no pinned versions",
                    self.name
                ))
            })
    }

    /// Produce the descriptor for one install run in the given mode.
    pub fn descriptor(
        &self,
        requested: Option<&str>,
        mode: SourceMode,
    ) -> Result<ArtifactDescriptor, InstallError> {
        let source = match mode {
            SourceMode::Pinned => {
                let (version, pinned) = self.select_version(requested)?;
                ArtifactSource::Pinned {
                    version: version.to_string(),
                    url: pinned.url.clone(),
                    checksum: pinned.sha256.clone(),
                    algorithm: ChecksumAlgorithm::Sha256,
                }
            }
            SourceMode::Head => {
                if requested.is_some() {
                    return Err(InstallError::MalformedDescriptor(format!(
                        "formula '{}': --head and an explicit version are mutually exclusive",
                        self.name
                    )));
                }
                let head = self.head.clone().ok_or_else(|| {
                    InstallError::MalformedDescriptor(format!(
                        "formula '{}' has no head reference",
                        self.name
                    ))
                })?;
                ArtifactSource::Head(head)
            }
        };

        Ok(ArtifactDescriptor {
            name: self.name.clone(),
            license: self.license.clone(),
            source,
        })
    }
}

impl ArtifactDescriptor {
    /// Static validation, run before any I/O.
    pub fn validate(&self) -> Result<(), InstallError> {
        match &self.source {
            ArtifactSource::Pinned {
                url,
                checksum,
                algorithm,
                ..
            } => {
                validate_http_url(url)?;
                validate_checksum(checksum, *algorithm)?;
            }
            ArtifactSource::Head(head) => {
                validate_git_url(&head.repo)?;
                if head.branch.is_empty() {
                    return Err(InstallError::MalformedDescriptor(
                        "head reference has an empty branch".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn validate_http_url(url: &str) -> Result<(), InstallError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            InstallError::MalformedDescriptor(format!("source URL must be http(s): {}", url))
        })?;

    // Need a host and at least one path segment naming the artifact.
    let mut parts = rest.splitn(2, '/');
    let host = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    if host.is_empty() || path.is_empty() {
        return Err(InstallError::MalformedDescriptor(format!(
            "source URL has no artifact path: {}",
            url
        )));
    }
    Ok(())
}

/// Only https://, http://, ssh://, and git@ URLs are accepted for head
/// checkouts.
pub(crate) fn validate_git_url(url: &str) -> Result<(), InstallError> {
    if url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("ssh://")
        || url.starts_with("git@")
    {
        Ok(())
    } else {
        Err(InstallError::MalformedDescriptor(format!(
            "unsupported git URL scheme: {}",
            url
        )))
    }
}

fn validate_checksum(checksum: &str, algorithm: ChecksumAlgorithm) -> Result<(), InstallError> {
    if checksum.len() != algorithm.hex_len() || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InstallError::MalformedDescriptor(format!(
            "checksum is not a valid {} hex digest ({} chars expected): {}",
            algorithm.name(),
            algorithm.hex_len(),
            checksum
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEAST: &str = r#"
name = "beast"
description = "ASCII terminal game"
homepage = "https://github.com/dominikwilkowski/beast"
license = "GPL-3.0-or-later"
build-deps = ["rust"]

[build]
toolchain = "cargo"
subdir = "beast"

[head]
repo = "https://github.com/dominikwilkowski/beast.git"
branch = "main"

[versions]
"1.0.0" = { url = "https://example.com/beast/v1.0.0.tar.gz", sha256 = "12b06613c4146ef77da3dac39989f9d49f56692e3991a44e7b0ac028ad4b4fdd" }
"1.0.2" = { url = "https://example.com/beast/v1.0.2.tar.gz", sha256 = "c651ead8f13c37cf31e02e85b034928fd704c66b199e0ad6d34074fd3b616904" }
"#;

    #[test]
    fn test_parse_formula() {
        let formula = Formula::parse(BEAST).unwrap();
        assert_eq!(formula.name, "beast");
        assert_eq!(formula.license, "GPL-3.0-or-later");
        assert_eq!(formula.build_deps, vec!["rust"]);
        assert_eq!(formula.build.subdir.as_deref(), Some("beast"));
        assert_eq!(formula.versions.len(), 2);
        assert_eq!(formula.head.as_ref().unwrap().branch, "main");
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let err = Formula::parse(&format!("bottled = true\n{}", BEAST)).unwrap_err();
        assert!(matches!(err, InstallError::MalformedDescriptor(_)));
    }

    #[test]
    fn test_select_latest_version() {
        let formula = Formula::parse(BEAST).unwrap();
        let (version, pinned) = formula.select_version(None).unwrap();
        assert_eq!(version, "1.0.2");
        assert!(pinned.url.contains("v1.0.2"));
    }

    #[test]
    fn test_select_explicit_version() {
        let formula = Formula::parse(BEAST).unwrap();
        let (version, pinned) = formula.select_version(Some("1.0.0")).unwrap();
        assert_eq!(version, "1.0.0");
        assert!(pinned.sha256.starts_with("12b06613"));
    }

    #[test]
    fn test_select_unknown_version() {
        let formula = Formula::parse(BEAST).unwrap();
        let err = formula.select_version(Some("9.9.9")).unwrap_err();
        assert!(matches!(err, InstallError::MalformedDescriptor(_)));
    }

    #[test]
    fn test_descriptor_pinned_validates() {
        let formula = Formula::parse(BEAST).unwrap();
        let desc = formula.descriptor(None, SourceMode::Pinned).unwrap();
        desc.validate().unwrap();
        match &desc.source {
            ArtifactSource::Pinned { version, .. } => assert_eq!(version, "1.0.2"),
            ArtifactSource::Head(_) => panic!("expected pinned source"),
        }
    }

    #[test]
    fn test_descriptor_head_validates() {
        let formula = Formula::parse(BEAST).unwrap();
        let desc = formula.descriptor(None, SourceMode::Head).unwrap();
        desc.validate().unwrap();
        assert!(matches!(desc.source, ArtifactSource::Head(_)));
    }

    #[test]
    fn test_head_with_explicit_version_rejected() {
        let formula = Formula::parse(BEAST).unwrap();
        let err = formula
            .descriptor(Some("1.0.0"), SourceMode::Head)
            .unwrap_err();
        assert!(matches!(err, InstallError::MalformedDescriptor(_)));
    }

    #[test]
    fn test_truncated_checksum_rejected_statically() {
        // One character short of a sha256 digest.
        let text = BEAST.replace(
            "c651ead8f13c37cf31e02e85b034928fd704c66b199e0ad6d34074fd3b616904",
            "c651ead8f13c37cf31e02e85b034928fd704c66b199e0ad6d34074fd3b61690",
        );
        let formula = Formula::parse(&text).unwrap();
        let desc = formula.descriptor(Some("1.0.2"), SourceMode::Pinned).unwrap();
        let err = desc.validate().unwrap_err();
        assert!(matches!(err, InstallError::MalformedDescriptor(_)));
    }

    #[test]
    fn test_non_hex_checksum_rejected() {
        let text = BEAST.replace(
            "c651ead8f13c37cf31e02e85b034928fd704c66b199e0ad6d34074fd3b616904",
            "z651ead8f13c37cf31e02e85b034928fd704c66b199e0ad6d34074fd3b616904",
        );
        let formula = Formula::parse(&text).unwrap();
        let desc = formula.descriptor(Some("1.0.2"), SourceMode::Pinned).unwrap();
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_bad_url_scheme_rejected() {
        let text = BEAST.replace(
            "https://example.com/beast/v1.0.2.tar.gz",
            "ftp://example.com/beast/v1.0.2.tar.gz",
        );
        let formula = Formula::parse(&text).unwrap();
        let desc = formula.descriptor(Some("1.0.2"), SourceMode::Pinned).unwrap();
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_url_without_path_rejected() {
        assert!(validate_http_url("https://example.com").is_err());
        assert!(validate_http_url("https://example.com/artifact.tar.gz").is_ok());
    }

    #[test]
    fn test_git_url_schemes() {
        assert!(validate_git_url("https://github.com/user/repo.git").is_ok());
        assert!(validate_git_url("git@github.com:user/repo.git").is_ok());
        assert!(validate_git_url("ssh://git@github.com/user/repo.git").is_ok());
        assert!(validate_git_url("file:///etc/passwd").is_err());
        assert!(validate_git_url("/local/path").is_err());
    }

    #[test]
    fn test_cargo_argv_shape() {
        let (program, args) = Toolchain::Cargo.argv(Path::new("/opt/stage"));
        assert_eq!(program, "cargo");
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["install", "--locked", "--root", "/opt/stage", "--path", "."]
        );
    }
}
