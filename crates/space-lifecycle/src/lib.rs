//! Wake / sleep / identify orchestration (spec §4.9): the provenance hook
//! every identity-bearing command runs through, and the two session
//! bookends around an agent's working period.

pub mod error;
pub mod identify;
pub mod sleep;
pub mod types;
pub mod wake;

pub use error::LifecycleError;
pub use identify::identify;
pub use sleep::sleep;
pub use types::{Orientation, SleepSummary, SLEEP_CHECKLIST};
pub use wake::wake;
