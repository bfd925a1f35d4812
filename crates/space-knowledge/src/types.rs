use serde::{Deserialize, Serialize};

/// A shared, domain-scoped knowledge entry attributed to the agent that
/// contributed it (spec §4.8), grounded in `knowledge/db.py`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knowledge {
    pub knowledge_id: String,
    pub domain: String,
    pub agent_id: String,
    pub content: String,
    pub confidence: Option<f64>,
    pub created_at: String,
    pub archived_at: Option<String>,
}
