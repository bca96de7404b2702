//! Sanity checks for images produced by a camera backend.
//!
//! A capture tool exiting with status 0 is not proof that a usable image
//! landed on disk. These checks catch empty or truncated output before it
//! is uploaded.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::traits::CaptureError;

/// JPEG start-of-image marker.
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Validates that `path` holds a non-empty JPEG file.
///
/// # Arguments
///
/// * `path` - Output path the backend was asked to write
///
/// # Returns
///
/// * `Ok(size)` with the file size in bytes if the image looks valid
/// * `Err(CaptureError::InvalidImage)` otherwise
///
/// # Errors
///
/// Returns `InvalidImage` if:
/// - The file does not exist or is not a regular file
/// - The file is empty
/// - The file does not start with the JPEG SOI marker
pub fn validate_jpeg(path: &Path) -> Result<u64, CaptureError> {
    let invalid = |reason: String| CaptureError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|err| invalid(err.to_string()))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file".to_owned()));
    }
    if metadata.len() == 0 {
        return Err(invalid("empty file".to_owned()));
    }

    let mut header = [0u8; 2];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .map_err(|err| invalid(format!("unreadable header: {err}")))?;

    if header != JPEG_SOI {
        return Err(invalid(format!(
            "missing JPEG marker (found {:02X} {:02X})",
            header[0], header[1]
        )));
    }

    Ok(metadata.len())
}
