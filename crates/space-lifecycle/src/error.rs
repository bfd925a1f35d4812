use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Registry(#[from] space_registry::RegistryError),
    #[error(transparent)]
    Bridge(#[from] space_bridge::BridgeError),
    #[error(transparent)]
    Memory(#[from] space_memory::MemoryError),
    #[error(transparent)]
    Events(#[from] space_events::EventError),
    #[error("failed to read constitution file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LifecycleError> for space_core::SpaceError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Registry(e) => e.into(),
            LifecycleError::Bridge(e) => e.into(),
            LifecycleError::Memory(e) => e.into(),
            LifecycleError::Events(e) => e.into(),
            LifecycleError::Io(e) => space_core::SpaceError::Storage(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
