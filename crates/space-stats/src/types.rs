use serde::{Deserialize, Serialize};

/// Per-agent usage counters (spec §4.10), resolved against the registry
/// so orphaned ids (seen in logs, never registered) still surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent_id: String,
    /// Registry name, or `None` for an agent seen only in logs.
    pub name: Option<String>,
    pub msgs: i64,
    pub mems: i64,
    pub knows: i64,
    pub events: i64,
    pub spawns: i64,
}

/// One row in the topic timeline (spec §4.10's `context` operation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub source: String,
    pub label: String,
    pub identity: Option<String>,
    pub data: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CurrentState {
    pub memory: Vec<MemoryHit>,
    pub knowledge: Vec<KnowledgeHit>,
    pub bridge: Vec<BridgeHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHit {
    pub identity: String,
    pub topic: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub domain: String,
    pub content: String,
    pub contributor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeHit {
    pub channel: String,
    pub sender: String,
    pub content: String,
}

/// Full result of a topic-context retrieval (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub timeline: Vec<TimelineEntry>,
    pub current_state: CurrentState,
    pub canon_docs: std::collections::HashMap<String, String>,
}
