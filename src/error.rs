//! Error type shared by the intake, transform and output stages

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelinkError>;

#[derive(Error, Debug)]
pub enum RelinkError {
    #[error("Missing {0}!")]
    MissingInput(&'static str),

    #[error("Rename value {0:?} cannot be used in a filename")]
    InvalidToken(String),

    #[error("No '{0}' folder found in the zip file!")]
    MissingImagesFolder(String),

    #[error("No '{0}' file found in the zip file!")]
    MissingHtmlFile(String),

    #[error("Refusing to rename {original} to {}: target already exists", .target.display())]
    OverwriteConflict { original: String, target: PathBuf },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read zip archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to build image name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl RelinkError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        RelinkError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit code: 2 for rejected input, 3 for a missing download, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelinkError::MissingInput(_)
            | RelinkError::InvalidToken(_)
            | RelinkError::MissingImagesFolder(_)
            | RelinkError::MissingHtmlFile(_)
            | RelinkError::OverwriteConflict { .. } => 2,
            RelinkError::NotFound(_) => 3,
            RelinkError::Archive { .. }
            | RelinkError::Io { .. }
            | RelinkError::Pattern(_)
            | RelinkError::Config { .. } => 1,
        }
    }
}
