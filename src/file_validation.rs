//! File validation before binding a surface to a file
//!
//! Checks for:
//! - File existence and permissions
//! - File size limits
//! - Markdown content type

use std::fs;
use std::path::Path;

/// Maximum file size in bytes (50 MB)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Extensions the surface can edit
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd", "mdx"];

/// Errors that can occur when validating a file for opening
#[derive(Debug, Clone, PartialEq)]
pub enum FileOpenError {
    /// File does not exist
    NotFound,
    /// Permission denied to read file
    PermissionDenied,
    /// Path is a directory, not a file
    IsDirectory,
    /// File is not a markdown document
    NotMarkdown,
    /// File exceeds size limit
    TooLarge { size_mb: f64 },
    /// Other I/O error
    IoError(String),
}

impl FileOpenError {
    /// Get a user-friendly error message
    pub fn user_message(&self, filename: &str) -> String {
        match self {
            Self::NotFound => format!("File not found: {}", filename),
            Self::PermissionDenied => format!("Permission denied: {}", filename),
            Self::IsDirectory => format!("Cannot open directory: {}", filename),
            Self::NotMarkdown => format!("Not a markdown file: {}", filename),
            Self::TooLarge { size_mb } => {
                format!(
                    "{} is too large ({:.1} MB, max {} MB)",
                    filename,
                    size_mb,
                    MAX_FILE_SIZE / (1024 * 1024)
                )
            }
            Self::IoError(msg) => format!("Error opening {}: {}", filename, msg),
        }
    }
}

impl std::fmt::Display for FileOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::IsDirectory => write!(f, "is a directory"),
            Self::NotMarkdown => write!(f, "not a markdown file"),
            Self::TooLarge { size_mb } => write!(f, "file too large ({:.1} MB)", size_mb),
            Self::IoError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FileOpenError {}

/// Check if a file path has a markdown extension
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MARKDOWN_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Validate a file before binding a surface to it
pub fn validate_markdown_file(path: &Path) -> Result<(), FileOpenError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FileOpenError::NotFound,
        std::io::ErrorKind::PermissionDenied => FileOpenError::PermissionDenied,
        _ => FileOpenError::IoError(e.to_string()),
    })?;

    if metadata.is_dir() {
        return Err(FileOpenError::IsDirectory);
    }

    if !is_markdown_file(path) {
        return Err(FileOpenError::NotMarkdown);
    }

    if metadata.len() > MAX_FILE_SIZE {
        return Err(FileOpenError::TooLarge {
            size_mb: metadata.len() as f64 / (1024.0 * 1024.0),
        });
    }

    Ok(())
}
