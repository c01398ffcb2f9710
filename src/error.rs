// Reframe Manager Error Types

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cascade::CascadeJournal;

#[derive(Error, Debug)]
pub enum ReframeError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Invalid name: '{0}'")]
    InvalidName(String),

    #[error("File already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),

    #[error("File missing: {0}")]
    FileMissing(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not launch editor: {0}")]
    EditorLaunch(String),

    #[error("Invalid handoff state: {0}")]
    InvalidState(String),

    #[error(
        "Edit commit failed moving {} to {}: {source}. The working directory may be inconsistent.",
        from.display(),
        to.display()
    )]
    HandoffCommit {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: Box<ReframeError>,
    },

    #[error("{0}")]
    CascadeIncomplete(Box<CascadeJournal>),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl ReframeError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ReframeError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Attach a path to bare `std::io::Result`s.
pub trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| ReframeError::io(path, e))
    }
}

pub type Result<T> = std::result::Result<T, ReframeError>;
