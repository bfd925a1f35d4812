use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Store(#[from] space_store::StoreError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid event data: {0}")]
    InvalidData(String),
}

impl From<EventError> for space_core::SpaceError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::Store(e) => e.into(),
            EventError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
            EventError::InvalidData(msg) => space_core::SpaceError::Validation(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
