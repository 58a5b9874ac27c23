//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the orchestration pipeline.
///
/// Each fan-out stage reports the first error observed as its result;
/// already-completed side effects (uploaded frames, written output files)
/// are never rolled back.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vedit_storage::StorageError),

    #[error("Metadata store error: {0}")]
    Metadata(#[from] vedit_store::StoreError),

    #[error("Model service error: {0}")]
    Service(#[from] vedit_genai::GenAiError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Local IO error: {0}")]
    LocalIo(#[from] std::io::Error),
}

impl PipelineError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
