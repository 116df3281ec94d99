//! Post-install smoke test.
//!
//! A liveness check, not a functional test: the installed binary is run
//! with a side-effect-free flag and must exit zero.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::InstallError;
use crate::output;

/// Flag the installed binary is invoked with
const SMOKE_FLAG: &str = "--version";

/// Run `binary --version` and assert a zero exit code.
pub fn smoke_test(binary: &Path) -> Result<(), InstallError> {
    output::detail(&format!("{} {}", binary.display(), SMOKE_FLAG));

    let status = Command::new(binary)
        .arg(SMOKE_FLAG)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if !status.success() {
        return Err(InstallError::SmokeTestFailure {
            exit_code: status.code(),
        });
    }

    Ok(())
}
