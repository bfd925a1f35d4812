use thiserror::Error;

/// The umbrella error taxonomy from spec §7. Every subsystem's local error
/// type converts into this at the boundary a caller needs to branch on
/// `code()` (CLI exit-code mapping, JSON error envelopes).
#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous id '{short}': matches {candidates:?}")]
    Ambiguous { short: String, candidates: Vec<String> },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("worker error: {0}")]
    Worker(String),
}

impl SpaceError {
    /// Short error code used for JSON error envelopes and CLI exit mapping
    /// (spec §7: pretty/JSON/quiet output modes all carry this code).
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Ambiguous { .. } => "AMBIGUOUS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Worker(_) => "WORKER_ERROR",
        }
    }

    /// Exit code per spec §6: 0 success (not represented here), 1 domain
    /// error, 124 timeout, 2 for anything else unexpected.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Timeout { .. } => 124,
            Self::NotFound(_)
            | Self::Ambiguous { .. }
            | Self::Validation(_)
            | Self::Conflict(_) => 1,
            Self::Migration(_) | Self::Storage(_) | Self::Worker(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpaceError>;
