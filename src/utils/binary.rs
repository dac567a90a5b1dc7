//! Executable and input-file checks.
//!
//! The network builder runs these before any process is created so that a
//! bad `--behavioral-exe` or `--json*` path fails the run early.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Errors that can occur while checking a path
#[derive(Debug, thiserror::Error)]
pub enum BinaryError {
    #[error("Binary not found: {path}")]
    NotFound { path: String },

    #[error("Binary is not executable: {path}")]
    NotExecutable { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Not a regular file: {path}")]
    NotAFile { path: String },
}

/// Validate that a binary exists and is executable.
pub fn validate_binary(path: &Path) -> Result<(), BinaryError> {
    let metadata = path.metadata().map_err(|_| BinaryError::NotFound {
        path: path.display().to_string(),
    })?;

    // Check if file is executable (any execute bit set)
    if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
        return Err(BinaryError::NotExecutable {
            path: path.display().to_string(),
        });
    }

    Ok(())
}

/// Validate that a regular file exists, e.g. a forwarding config.
pub fn validate_file(path: &Path) -> Result<(), BinaryError> {
    let metadata = path.metadata().map_err(|_| BinaryError::FileNotFound {
        path: path.display().to_string(),
    })?;

    if !metadata.is_file() {
        return Err(BinaryError::NotAFile {
            path: path.display().to_string(),
        });
    }

    Ok(())
}
