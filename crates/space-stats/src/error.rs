use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Registry(#[from] space_registry::RegistryError),
    #[error(transparent)]
    Bridge(#[from] space_bridge::BridgeError),
    #[error(transparent)]
    Memory(#[from] space_memory::MemoryError),
    #[error(transparent)]
    Knowledge(#[from] space_knowledge::KnowledgeError),
    #[error(transparent)]
    Events(#[from] space_events::EventError),
}

impl From<StatsError> for space_core::SpaceError {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::Registry(e) => e.into(),
            StatsError::Bridge(e) => e.into(),
            StatsError::Memory(e) => e.into(),
            StatsError::Knowledge(e) => e.into(),
            StatsError::Events(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
