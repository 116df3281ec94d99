//! Single-artifact formula installer
//!
//! A formula is a static TOML record naming what to fetch, how to verify
//! it, and how to build it. The engine drives one atomic run per install:
//! fetch the pinned release tarball (or a head branch checkout), verify
//! its sha256 digest against the formula, run the formula's build
//! toolchain into a staged prefix, and smoke-test the installed binary.
//!
//! # Example Formula
//!
//! ```toml
//! name = "beast"
//! description = "ASCII terminal game"
//! homepage = "https://github.com/dominikwilkowski/beast"
//! license = "GPL-3.0-or-later"
//! build-deps = ["rust"]
//!
//! [build]
//! toolchain = "cargo"
//! subdir = "beast"
//!
//! [head]
//! repo = "https://github.com/dominikwilkowski/beast.git"
//! branch = "main"
//!
//! [versions]
//! "1.0.0" = { url = "https://github.com/dominikwilkowski/beast/archive/refs/tags/v1.0.0.tar.gz", sha256 = "12b06613c4146ef77da3dac39989f9d49f56692e3991a44e7b0ac028ad4b4fdd" }
//! ```
//!
//! # Pipeline
//!
//! `Pending -> Fetched -> Verified -> Built -> Tested -> Done`, strictly
//! sequential; the first failure is terminal (`Failed`) and the run's
//! scratch directory is discarded on every exit path. Head installs skip
//! verification - trust shifts to the git transport, and the pipeline
//! warns about it.
//!
//! # Exit codes
//!
//! The `formula` binary maps each failure category to a stable exit code
//! so scripts can tell a checksum mismatch from a build failure; see
//! [`InstallError::exit_code`].

pub mod build;
mod context;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod lock;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod smoke;
pub mod verify;

pub use context::BuildContext;
pub use descriptor::{ArtifactDescriptor, ArtifactSource, Formula, SourceMode};
pub use error::InstallError;
pub use pipeline::{InstallResult, Pipeline, RunState};
pub use registry::Registry;
