//! The control-plane command script.
//!
//! Loaded once before the network starts and replayed, unmodified, to every
//! switch. Its content is opaque: it is never parsed, only counted for logs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read command script '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Immutable in-memory command script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScript {
    source: PathBuf,
    text: String,
}

impl CommandScript {
    /// Read the whole script into memory
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::from_text(path, text);
        if script.command_count() == 0 {
            log::warn!("Command script {:?} contains no commands", path);
        }
        Ok(script)
    }

    pub fn from_text(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Exact bytes fed to the client's stdin
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Number of non-blank lines
    pub fn command_count(&self) -> usize {
        self.text.lines().filter(|l| !l.trim().is_empty()).count()
    }
}
