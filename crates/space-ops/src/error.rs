use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("no task found with id '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] space_store::StoreError),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl From<OpsError> for space_core::SpaceError {
    fn from(e: OpsError) -> Self {
        match e {
            OpsError::NotFound(id) => space_core::SpaceError::NotFound(id),
            OpsError::Store(e) => e.into(),
            OpsError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
