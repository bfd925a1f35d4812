//! The optional hierarchical task tree: create/claim/complete/block,
//! and reduction of completed subtask handovers into their parent
//! (spec §4, grounded in `ops/api/__init__.py`). Emits no events of its
//! own, mirroring `space-bridge`/`space-registry`.
pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::OpsError;
pub use manager::OpsStore;
pub use types::{Task, TaskStatus, TaskTree};
