use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("no entry found with id ending in '{0}'")]
    NotFound(String),

    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    #[error("ambiguous id '{short}': matches {candidates:?}")]
    Ambiguous { short: String, candidates: Vec<String> },

    #[error(transparent)]
    Store(#[from] space_store::StoreError),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Registry(#[from] space_registry::RegistryError),

    #[error(transparent)]
    Events(#[from] space_events::EventError),
}

impl From<MemoryError> for space_core::SpaceError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::NotFound(id) => space_core::SpaceError::NotFound(id),
            MemoryError::AgentNotFound(id) => space_core::SpaceError::NotFound(id),
            MemoryError::Ambiguous { short, candidates } => {
                space_core::SpaceError::Ambiguous { short, candidates }
            }
            MemoryError::Store(e) => e.into(),
            MemoryError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
            MemoryError::Registry(e) => e.into(),
            MemoryError::Events(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
