//! Cross-store aggregation: per-agent usage stats and topic-context
//! retrieval spanning events, bridge, memory, and knowledge (spec §4.10).

pub mod context;
pub mod error;
pub mod stats;
pub mod types;

pub use context::context;
pub use error::StatsError;
pub use stats::stats;
pub use types::{AgentStats, BridgeHit, ContextResult, CurrentState, KnowledgeHit, MemoryHit, TimelineEntry};
