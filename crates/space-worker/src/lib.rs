//! Mention-driven subprocess fan-out (spec §4.6).
//!
//! When a message lands in a channel, `dispatch_mentions` parses `@name`
//! mentions out of its content and spawns one `spawn <identity>` process
//! per mention, each bounded by a wall-clock timeout. A clean, non-empty
//! run is posted back to the channel as a new message attributed to the
//! mentioned identity; anything else (timeout, non-zero exit, empty
//! output) is reported but never posted. Messages authored by the
//! `system` sentinel never dispatch a worker, which breaks the loop a
//! system-authored reply would otherwise feed back into mention parsing.

pub mod dispatch;
pub mod error;
pub mod prompt;
pub mod spawn;
pub mod types;

pub use dispatch::dispatch_mentions;
pub use error::{Result, WorkerError};
pub use prompt::spawn_from_mention;
pub use spawn::run_spawn;
pub use types::WorkerResult;
