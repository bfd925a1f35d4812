use thiserror::Error;

/// Errors from the agent/constitution registry (spec §4.2).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("agent name already taken: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Store(#[from] space_store::StoreError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl From<RegistryError> for space_core::SpaceError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => space_core::SpaceError::NotFound(id),
            RegistryError::AlreadyExists(name) => space_core::SpaceError::Conflict(name),
            RegistryError::Store(e) => e.into(),
            RegistryError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
            RegistryError::UnknownRole(role) => space_core::SpaceError::Validation(role),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
