use thiserror::Error;

/// Errors raised by the shared connection/migration layer every other store
/// crate (`space-registry`, `space-bridge`, `space-memory`, `space-knowledge`,
/// `space-events`, `space-ops`) builds its own schema on top of.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A migration's before/after row-count check found rows missing from a
    /// tracked table — the migration was rolled back (spec §4.1).
    #[error("migration error: {0}")]
    Migration(String),

    /// A backup or maintenance operation is already running against this
    /// store directory.
    #[error("locked: {0}")]
    Locked(String),
}

impl From<StoreError> for space_core::SpaceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
            StoreError::Io(e) => space_core::SpaceError::Storage(e.to_string()),
            StoreError::Migration(msg) => space_core::SpaceError::Migration(msg),
            StoreError::Locked(msg) => space_core::SpaceError::Storage(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
