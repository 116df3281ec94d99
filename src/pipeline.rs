//! Install pipeline - drives one atomic run through
//! fetch -> verify -> build -> smoke test.
//!
//! The run is all-or-nothing: the first failure is terminal, the scratch
//! directory is discarded on every exit path, and nothing is retried.

use std::path::PathBuf;

use crate::build;
use crate::context::BuildContext;
use crate::descriptor::{ArtifactDescriptor, ArtifactSource, BuildSpec, Formula, SourceMode};
use crate::error::InstallError;
use crate::fetch::{self, Fetched};
use crate::lock;
use crate::output;
use crate::smoke;
use crate::verify;

/// Progress of one install run.
///
/// States only ever advance; any failure moves to `Failed`, which is
/// terminal. There are no retries and no partial-success states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Fetched,
    Verified,
    Built,
    Tested,
    Done,
    Failed(String),
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// The installed executable, at `<prefix>/bin/<name>`.
    pub binary: PathBuf,
    /// Version installed; `None` for head installs.
    pub version: Option<String>,
    pub from_head: bool,
}

/// One install run for one formula.
#[derive(Debug)]
pub struct Pipeline {
    descriptor: ArtifactDescriptor,
    build: BuildSpec,
    prefix: PathBuf,
    state: RunState,
}

impl Pipeline {
    /// Prepare a run. Resolves the formula to a descriptor for `mode` and
    /// validates it statically - a malformed descriptor is rejected here,
    /// before any I/O.
    pub fn new(
        formula: &Formula,
        version: Option<&str>,
        mode: SourceMode,
        prefix: impl Into<PathBuf>,
    ) -> Result<Self, InstallError> {
        let descriptor = formula.descriptor(version, mode)?;
        descriptor.validate()?;

        Ok(Self {
            descriptor,
            build: formula.build.clone(),
            prefix: prefix.into(),
            state: RunState::Pending,
        })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn descriptor(&self) -> &ArtifactDescriptor {
        &self.descriptor
    }

    /// Drive the run to completion.
    ///
    /// Holds the per-formula exclusive lock for the whole run. The scratch
    /// directory lives inside the returned context and is removed when the
    /// run ends, whichever way it ends.
    pub fn run(&mut self) -> Result<InstallResult, InstallError> {
        let _lock = lock::acquire_install_lock(&self.descriptor.name)?;
        let ctx = BuildContext::create(&self.prefix)?;

        match self.drive(&ctx) {
            Ok(result) => {
                self.state = RunState::Done;
                output::success(&format!(
                    "{} installed to {}",
                    self.descriptor.name,
                    result.binary.display()
                ));
                Ok(result)
            }
            Err(err) => {
                self.state = RunState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn drive(&mut self, ctx: &BuildContext) -> Result<InstallResult, InstallError> {
        let name = self.descriptor.name.clone();
        output::action(&format!("Installing {}", name));

        output::phase("fetch");
        let fetched = fetch::fetch(&self.descriptor, ctx.work_dir())?;
        self.state = RunState::Fetched;

        match &fetched {
            // fetch() yields an archive exactly when the source is pinned.
            Fetched::Archive(archive) => {
                let ArtifactSource::Pinned {
                    checksum,
                    algorithm,
                    ..
                } = &self.descriptor.source
                else {
                    unreachable!("archive fetched for a head source");
                };
                output::phase("verify");
                verify::verify(archive, checksum, *algorithm)?;
            }
            // Head checkouts have no pinned digest; trust shifts to the
            // git transport, which is weaker than a pinned checksum.
            Fetched::Tree(_) => {
                output::warning("head install: skipping checksum verification");
            }
        }
        self.state = RunState::Verified;

        output::phase("build");
        let binary = build::build(ctx, &self.build, &name, &fetched)?;
        self.state = RunState::Built;

        output::phase("test");
        smoke::smoke_test(&binary)?;
        self.state = RunState::Tested;

        let (version, from_head) = match &self.descriptor.source {
            ArtifactSource::Pinned { version, .. } => (Some(version.clone()), false),
            ArtifactSource::Head(_) => (None, true),
        };

        Ok(InstallResult {
            binary,
            version,
            from_head,
        })
    }
}
