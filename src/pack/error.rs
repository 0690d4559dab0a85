//! Error types for evidence pack writes.
//!
//! Loading never produces a `PackError`: a missing or unreadable pack is an
//! expected outcome and is reported as `None` by the loader.

use std::path::{Path, PathBuf};

/// Error type for evidence pack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// Run id cannot be used as a directory name.
    #[error("Invalid run id {0:?}: must be a single non-empty path component")]
    InvalidRunId(String),

    /// Crop id cannot be used inside a file name.
    #[error("Invalid crop id {0:?}: must be a single non-empty path component")]
    InvalidCropId(String),

    /// An iframe or tag record has an empty or whitespace-only id.
    #[error("Blank {kind} id at index {index}")]
    BlankRecordId { kind: &'static str, index: usize },

    /// A screenshot supplied as a data URL was not base64-encoded.
    #[error("Screenshot {0} is not a base64 data URL")]
    InvalidDataUrl(String),

    /// A screenshot supplied as base64 text did not decode.
    #[error("Failed to decode base64 screenshot {name}: {source}")]
    Base64 {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Serialization of a structured artifact failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying storage failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackError>;
