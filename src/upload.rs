//! Writing files dropped or pasted into the surface
//!
//! Each file is handled on its own: a bad name, bad payload or failed write
//! is reported for that file and the rest of the batch continues.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

use crate::messages::UploadFile;
use crate::sanitize::{upload_target, PathError};

/// Why a single uploaded file was not written
#[derive(Debug)]
pub enum UploadError {
    /// Name was rejected by the path sanitizer
    Path { name: String, error: PathError },
    /// Payload was not valid base64
    Decode {
        name: String,
        error: base64::DecodeError,
    },
    /// Creating the directory or writing the file failed
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl UploadError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Path { name, error } => format!("{} ({})", error.user_message(), name),
            Self::Decode { name, .. } => format!("Upload of {} was not valid base64", name),
            Self::Io { path, error } => {
                format!("Failed to write {}: {}", path.display(), error)
            }
        }
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path { name, error } => write!(f, "{}: {}", name, error),
            Self::Decode { name, error } => write!(f, "{}: {}", name, error),
            Self::Io { path, error } => write!(f, "{}: {}", path.display(), error),
        }
    }
}

impl std::error::Error for UploadError {}

/// Outcome of one upload batch
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Files written, in request order
    pub written: Vec<PathBuf>,
    pub errors: Vec<UploadError>,
}

/// Write every file of an upload request into `dest_dir`.
///
/// `dest_dir` must already be resolved and validated
/// (see [`crate::sanitize::resolve_upload_dir`]).
pub fn save_uploads(files: &[UploadFile], dest_dir: &Path) -> UploadReport {
    let mut report = UploadReport::default();
    for file in files {
        match save_one(file, dest_dir) {
            Ok(path) => {
                tracing::info!("Uploaded {} to {}", file.name, path.display());
                report.written.push(path);
            }
            Err(error) => {
                tracing::warn!("Upload failed: {}", error);
                report.errors.push(error);
            }
        }
    }
    report
}

fn save_one(file: &UploadFile, dest_dir: &Path) -> Result<PathBuf, UploadError> {
    let target = upload_target(dest_dir, &file.name).map_err(|error| UploadError::Path {
        name: file.name.clone(),
        error,
    })?;

    let bytes = STANDARD
        .decode(file.base64.trim())
        .map_err(|error| UploadError::Decode {
            name: file.name.clone(),
            error,
        })?;

    std::fs::create_dir_all(dest_dir).map_err(|error| UploadError::Io {
        path: dest_dir.to_path_buf(),
        error,
    })?;
    std::fs::write(&target, bytes).map_err(|error| UploadError::Io {
        path: target.clone(),
        error,
    })?;
    Ok(target)
}
