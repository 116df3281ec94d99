//! Common test utilities - tarball fixtures and formula text.

#![allow(dead_code)]

use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Build a gzipped tarball in memory from (path, contents) entries.
pub fn make_tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, *name, *content).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// A release-shaped source tarball holding a tiny dependency-free cargo
/// crate under `<name>-<version>/cli/`, so a real `cargo install` run can
/// build it offline.
pub fn make_source_tarball(name: &str, version: &str) -> Vec<u8> {
    let root = format!("{}-{}", name, version);

    let manifest = format!(
        "[package]\nname = \"{name}\"\nversion = \"{version}\"\nedition = \"2021\"\n\n[[bin]]\nname = \"{name}\"\npath = \"src/main.rs\"\n"
    );
    // cargo install runs with --locked; a dependency-free crate needs only
    // its own lockfile entry.
    let lockfile = format!(
        "# This file is automatically @generated by Cargo.\n# It is not intended for manual editing.\nversion = 3\n\n[[package]]\nname = \"{name}\"\nversion = \"{version}\"\n"
    );
    let main = format!(
        "fn main() {{\n    if std::env::args().any(|a| a == \"--version\") {{\n        println!(\"{name} {version}\");\n    }}\n}}\n"
    );

    make_tar_gz(&[
        (&format!("{root}/cli/Cargo.toml"), manifest.as_bytes()),
        (&format!("{root}/cli/Cargo.lock"), lockfile.as_bytes()),
        (&format!("{root}/cli/src/main.rs"), main.as_bytes()),
    ])
}

/// Sha256 hex digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest;
    hex::encode(sha2::Sha256::digest(bytes))
}

/// Formula text for a cargo-built package whose tarball lives at `url`.
pub fn formula_text(name: &str, version: &str, url: &str, sha256: &str) -> String {
    format!(
        r#"
name = "{name}"
description = "pipeline test fixture"
license = "MIT"
build-deps = ["rust"]

[build]
toolchain = "cargo"
subdir = "cli"

[versions]
"{version}" = {{ url = "{url}", sha256 = "{sha256}" }}
"#
    )
}

/// Write a formula file into `dir`.
pub fn write_formula(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(format!("{}.toml", name)), text).unwrap();
}
