use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Space(#[from] space_core::SpaceError),
    #[error(transparent)]
    Events(#[from] space_events::EventError),
    #[error(transparent)]
    Registry(#[from] space_registry::RegistryError),
    #[error(transparent)]
    Bridge(#[from] space_bridge::BridgeError),
    #[error(transparent)]
    Memory(#[from] space_memory::MemoryError),
    #[error(transparent)]
    Knowledge(#[from] space_knowledge::KnowledgeError),
    #[error(transparent)]
    Lifecycle(#[from] space_lifecycle::LifecycleError),
    #[error(transparent)]
    Stats(#[from] space_stats::StatsError),
    #[error(transparent)]
    Ops(#[from] space_ops::OpsError),
    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KernelError> for space_core::SpaceError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::Space(e) => e,
            KernelError::Events(e) => e.into(),
            KernelError::Registry(e) => e.into(),
            KernelError::Bridge(e) => e.into(),
            KernelError::Memory(e) => e.into(),
            KernelError::Knowledge(e) => e.into(),
            KernelError::Lifecycle(e) => e.into(),
            KernelError::Stats(e) => e.into(),
            KernelError::Ops(e) => e.into(),
            KernelError::Io(e) => space_core::SpaceError::Storage(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
