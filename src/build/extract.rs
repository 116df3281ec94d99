//! Native archive extraction (no external tools needed).
//!
//! Formats are detected from the filename. Extraction refuses absolute
//! paths, `..` components, writes through symlinked components, and link
//! targets that resolve outside the destination.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::InstallError;
use crate::output;

/// Extract an archive into `dest`, creating it if needed.
///
/// Supports tar.gz, tar.xz, tar.bz2, tar.zst, tar, and zip.
pub fn extract(archive: &Path, dest: &Path) -> Result<(), InstallError> {
    let name = archive
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());
    let format = detect_format(&name)
        .ok_or_else(|| InstallError::UnsupportedFormat(name.clone()))?;

    std::fs::create_dir_all(dest)?;

    let pb = output::spinner(&format!("extracting {}", name));
    let result = match format {
        Format::TarGz => {
            let reader = open(archive)?;
            extract_tar(flate2::read::GzDecoder::new(reader), dest)
        }
        Format::TarXz => {
            let reader = open(archive)?;
            extract_tar(xz2::read::XzDecoder::new(reader), dest)
        }
        Format::TarBz2 => {
            let reader = open(archive)?;
            extract_tar(bzip2::read::BzDecoder::new(reader), dest)
        }
        Format::TarZst => {
            let reader = open(archive)?;
            let decoder = zstd::stream::read::Decoder::new(reader)?;
            extract_tar(decoder, dest)
        }
        Format::Tar => extract_tar(open(archive)?, dest),
        Format::Zip => extract_zip(archive, dest),
    };
    pb.finish_and_clear();

    result?;
    output::detail(&format!("extracted {} to {}", name, dest.display()));
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Tar,
    Zip,
}

fn detect_format(filename: &str) -> Option<Format> {
    let name = filename.to_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(Format::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(Format::TarXz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(Format::TarBz2)
    } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
        Some(Format::TarZst)
    } else if name.ends_with(".zip") {
        Some(Format::Zip)
    } else if name.ends_with(".tar") {
        Some(Format::Tar)
    } else {
        None
    }
}

fn open(archive: &Path) -> Result<BufReader<File>, InstallError> {
    Ok(BufReader::new(File::open(archive)?))
}

fn unsafe_archive(msg: String) -> InstallError {
    InstallError::Io(std::io::Error::other(msg))
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<(), InstallError> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive
        .entries()
        .map_err(|e| unsafe_archive(format!("tar read error: {}", e)))?
    {
        let mut entry = entry.map_err(|e| unsafe_archive(format!("tar entry error: {}", e)))?;

        let path = entry
            .path()
            .map_err(|e| unsafe_archive(format!("tar path error: {}", e)))?
            .into_owned();

        if path.is_absolute() || path.components().any(|c| c == Component::ParentDir) {
            return Err(unsafe_archive(format!(
                "tar contains unsafe path: {}",
                path.display()
            )));
        }

        // Some archives carry a "." entry; skip it.
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = dest.join(&path);
        reject_symlinked_components(dest, &full_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link {
            let link_name = entry
                .link_name()
                .map_err(|e| unsafe_archive(format!("tar link_name error: {}", e)))?
                .ok_or_else(|| {
                    unsafe_archive(format!("tar link without target: {}", path.display()))
                })?;
            let link_parent = full_path.parent().unwrap_or(dest);
            reject_escaping_link(dest, link_parent, &link_name)?;
        }

        if let Some(parent) = full_path.parent() {
            if parent.starts_with(dest) {
                reject_symlinked_components(dest, parent)?;
            }
            std::fs::create_dir_all(parent)?;
        }

        entry
            .unpack(&full_path)
            .map_err(|e| unsafe_archive(format!("unpack error for {}: {}", path.display(), e)))?;
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), InstallError> {
    let file = File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| unsafe_archive(format!("zip read error: {}", e)))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| unsafe_archive(format!("zip entry error: {}", e)))?;

        // enclosed_name already rejects traversal; entries without one are
        // skipped rather than trusted.
        let outpath = match file.enclosed_name() {
            Some(path) => dest.join(path),
            None => continue,
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
                }
            }
        }
    }

    Ok(())
}

/// Reject writes through a symlinked path component under `dest`.
fn reject_symlinked_components(dest: &Path, full_path: &Path) -> Result<(), InstallError> {
    let rel = full_path.strip_prefix(dest).map_err(|_| {
        unsafe_archive(format!(
            "tar contains path outside destination: {}",
            full_path.display()
        ))
    })?;

    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(unsafe_archive(format!(
                "extraction blocked: symlink in path component: {}",
                cur.display()
            )));
        }
    }

    Ok(())
}

/// Reject link targets that are absolute or resolve outside `dest`.
fn reject_escaping_link(
    dest: &Path,
    link_parent: &Path,
    link_name: &Path,
) -> Result<(), InstallError> {
    if link_name.is_absolute()
        || link_name
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(unsafe_archive(format!(
            "unsafe link target (absolute): {}",
            link_name.display()
        )));
    }

    let candidate = normalize_lexical(&link_parent.join(link_name));
    let norm_dest = normalize_lexical(dest);
    if candidate.strip_prefix(&norm_dest).is_err() {
        return Err(unsafe_archive(format!(
            "unsafe link target (escapes dest): {} -> {}",
            link_parent.display(),
            link_name.display()
        )));
    }

    Ok(())
}

/// Lexically normalize a path (no filesystem access); used to validate link
/// targets without following symlinks.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    // Preserve leading ".." for relative paths.
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}
