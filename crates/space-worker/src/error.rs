use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Bridge(#[from] space_bridge::BridgeError),
}

impl From<WorkerError> for space_core::SpaceError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::Bridge(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
