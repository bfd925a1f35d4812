use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("no entry found with id ending in '{0}'")]
    NotFound(String),

    #[error("ambiguous id '{short}': matches {candidates:?}")]
    Ambiguous { short: String, candidates: Vec<String> },

    #[error(transparent)]
    Store(#[from] space_store::StoreError),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Events(#[from] space_events::EventError),
}

impl From<KnowledgeError> for space_core::SpaceError {
    fn from(e: KnowledgeError) -> Self {
        match e {
            KnowledgeError::NotFound(id) => space_core::SpaceError::NotFound(id),
            KnowledgeError::Ambiguous { short, candidates } => {
                space_core::SpaceError::Ambiguous { short, candidates }
            }
            KnowledgeError::Store(e) => e.into(),
            KnowledgeError::Database(e) => space_core::SpaceError::Storage(e.to_string()),
            KnowledgeError::Events(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;
