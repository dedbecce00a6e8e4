use std::path::PathBuf;

use thiserror::Error;

use crate::types::MediaKind;

pub type BlobResult<T> = Result<T, BlobError>;

/// Failures reported by a blob store.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Delete failed: {reason}")]
    DeleteFailed { reason: String },

    #[error("Invalid blob store configuration: {message}")]
    Config { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    pub fn delete_failed<S: Into<String>>(reason: S) -> Self {
        Self::DeleteFailed {
            reason: reason.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Why a staged file did not make it into the blob store.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No {kind} file found at {}", path.display())]
    MissingFile { kind: MediaKind, path: PathBuf },

    #[error("{kind} is {actual_size} bytes, larger than the {limit} byte limit")]
    SizeLimitExceeded {
        kind: MediaKind,
        actual_size: u64,
        limit: u64,
    },

    #[error("Could not read staged {kind} file: {source}")]
    Io {
        kind: MediaKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Media upload failed: {0}")]
    Upload(#[from] BlobError),
}

impl IngestError {
    /// Errors caused by the submitted file rather than by the remote store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::MissingFile { .. } | IngestError::SizeLimitExceeded { .. }
        )
    }
}
