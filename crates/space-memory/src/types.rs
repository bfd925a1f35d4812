use serde::{Deserialize, Serialize};

/// A single per-agent memory entry, with optional supersession linkage
/// (spec §4.7), grounded in `memory/db.py`'s `memories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub memory_id: String,
    pub agent_id: String,
    pub topic: String,
    pub message: String,
    pub timestamp: String,
    pub created_at: String,
    pub archived_at: Option<String>,
    pub core: bool,
    pub source: String,
    pub bridge_channel: Option<String>,
    pub code_anchors: Option<String>,
    pub synthesis_note: Option<String>,
    /// Comma-joined predecessor `memory_id`s this entry superseded.
    pub supersedes: Option<String>,
    /// The entry that superseded this one, if any.
    pub superseded_by: Option<String>,
}

/// A memory's full lineage across `supersedes`/`superseded_by` pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryChain {
    pub start_entry: Option<Memory>,
    pub predecessors: Vec<Memory>,
    pub successors: Vec<Memory>,
}
