//! HTTP download of pinned release artifacts.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::InstallError;
use crate::output;

/// Download `url` to `dest`, streaming with a progress bar.
///
/// HTTP 404 maps to `NotFound`; any other transport failure maps to
/// `Network`. A failed transfer removes its partial file so the scratch
/// directory never holds partial artifacts. No transfer timeout is set;
/// bounding overall run time is the caller environment's job.
pub fn download(url: &str, dest: &Path) -> Result<(), InstallError> {
    let filename = dest
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());

    let pb = output::spinner(&format!("downloading {}", filename));

    let response = match ureq::get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(404, _)) => {
            pb.finish_and_clear();
            return Err(InstallError::NotFound(url.to_string()));
        }
        Err(ureq::Error::Status(code, _)) => {
            pb.finish_and_clear();
            return Err(InstallError::Network(format!("HTTP {} for {}", code, url)));
        }
        Err(e) => {
            pb.finish_and_clear();
            return Err(InstallError::Network(format!("download failed: {}", e)));
        }
    };

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        output::upgrade_to_bytes(&pb, len);
    }

    let result = stream_to_file(response, dest, &pb);
    pb.finish_and_clear();

    let total_bytes = match result {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(dest);
            return Err(e);
        }
    };

    output::detail(&format!("downloaded {} ({} bytes)", filename, total_bytes));
    Ok(())
}

fn stream_to_file(
    response: ureq::Response,
    dest: &Path,
    pb: &indicatif::ProgressBar,
) -> Result<u64, InstallError> {
    let mut file = std::fs::File::create(dest)?;
    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| InstallError::Network(format!("read error mid-transfer: {}", e)))?;
        if n == 0 {
            break;
        }

        file.write_all(&buffer[..n])?;
        total_bytes += n as u64;
        pb.set_position(total_bytes);
    }

    Ok(total_bytes)
}
