pub mod config;
pub mod error;
pub mod types;

pub use config::SpaceConfig;
pub use error::{Result, SpaceError};
pub use types::{AgentId, BaseIdentity, ChannelId, MessagePriority, ShortIdResolution};
