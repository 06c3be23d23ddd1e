use thiserror::Error;

/// Error taxonomy for the ingestion pipeline (spec.md §7).
///
/// Per-file and per-symbol failures (IO-transient, Parse-failure,
/// Resolution-miss) are deliberately **not** represented here — they are
/// recorded locally in a [`crate::domain::PhaseErrorLog`] and never unwind a
/// phase. Only failures that must abort the enclosing chunk or the whole
/// pipeline get a `DomainError` variant.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker sub-batch timed out after {0:?}")]
    WorkerTimeout(std::time::Duration),

    #[error("worker crashed: {0}")]
    WorkerCrash(String),

    #[error("chunk {0} failed: {1}")]
    ChunkFailed(usize, String),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Internal(_) | Self::InvalidInput(_)
        )
    }
}
