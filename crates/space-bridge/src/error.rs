use thiserror::Error;

/// Errors from the channel message bus (spec §4.5).
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A lookup (not a resolve) was made against an unknown channel name.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error(transparent)]
    Store(#[from] space_store::StoreError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<BridgeError> for space_core::SpaceError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::ChannelNotFound(name) => space_core::SpaceError::NotFound(name),
            BridgeError::Store(e) => e.into(),
            BridgeError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
