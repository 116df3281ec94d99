//! Build phase - unpacks the verified source and runs the formula's
//! toolchain into the staged install prefix.
//!
//! Exactly one external build command runs per install. Its command and
//! argument shape come from the toolchain enum, never from formula text,
//! and its working directory is scoped through `Command::current_dir` -
//! the process-global cwd is never touched.

pub mod extract;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::context::BuildContext;
use crate::descriptor::BuildSpec;
use crate::error::InstallError;
use crate::fetch::Fetched;
use crate::output;

/// Lines of stderr preserved verbatim on build failure
const STDERR_TAIL_LINES: usize = 20;

/// Build the fetched (and, for archives, verified) source and install it
/// into the context's prefix. Returns the installed binary path.
pub fn build(
    ctx: &BuildContext,
    spec: &BuildSpec,
    name: &str,
    fetched: &Fetched,
) -> Result<PathBuf, InstallError> {
    let tree = match fetched {
        Fetched::Archive(archive) => {
            let unpack_root = ctx.work_dir().join("src");
            extract::extract(archive, &unpack_root)?;
            source_tree(&unpack_root)?
        }
        Fetched::Tree(tree) => tree.clone(),
    };

    let build_dir = match &spec.subdir {
        Some(subdir) => tree.join(subdir),
        None => tree,
    };
    if !build_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("build directory missing from source tree: {}", build_dir.display()),
        )
        .into());
    }

    let (program, args) = spec.toolchain.argv(ctx.install_prefix());
    run_build_command(program, &args, &build_dir)?;

    let binary = ctx.install_prefix().join("bin").join(name);
    if !binary.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "build succeeded but no binary at {}",
                binary.display()
            ),
        )
        .into());
    }

    Ok(binary)
}

/// Run one external build command in `dir`, capturing stderr for
/// diagnostics. Non-zero exit surfaces as `BuildFailure` with the exit code
/// and the stderr tail, verbatim.
fn run_build_command(program: &str, args: &[OsString], dir: &Path) -> Result<(), InstallError> {
    output::detail(&format!("{} (in {})", program, dir.display()));
    let pb = output::spinner(&format!("running {}", program));

    let out = Command::new(program).args(args).current_dir(dir).output();
    pb.finish_and_clear();

    let out = out?;
    if !out.status.success() {
        return Err(InstallError::BuildFailure {
            exit_code: out.status.code(),
            stderr_tail: stderr_tail(&out.stderr),
        });
    }

    Ok(())
}

/// A release tarball unpacks to a single top-level directory; use it as the
/// source tree. Anything else (e.g. a flat archive) is treated as the tree
/// itself.
fn source_tree(unpack_root: &Path) -> Result<PathBuf, InstallError> {
    let entries: Vec<_> = std::fs::read_dir(unpack_root)?
        .collect::<Result<_, _>>()?;

    if entries.len() == 1 && entries[0].path().is_dir() {
        Ok(entries[0].path())
    } else {
        Ok(unpack_root.to_path_buf())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
