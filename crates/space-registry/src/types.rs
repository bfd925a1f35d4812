use serde::{Deserialize, Serialize};

/// A registered agent identity: a name (its primary handle), an optional
/// self-description injected into its constitution, and an optional
/// `canonical_id` for when two registered names turn out to be the same
/// agent (spec §4.2; `spawn/registry.py::get_agent_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub self_description: Option<String>,
    pub canonical_id: Option<String>,
    pub created_at: String,
}

/// An alternate name that resolves to the same agent. Every agent's own
/// name is also stored here as its first alias (spec §2 — supplemented
/// bootstrap behaviour from `ensure_agent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAlias {
    pub agent_id: String,
    pub alias: String,
}
