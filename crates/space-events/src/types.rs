use serde::{Deserialize, Serialize};

/// One append-only entry in the workspace-wide event journal (spec §4.7).
///
/// Every subsystem emits here: constitution invocations, identity commands,
/// memory mutations, channel activity. The journal is read-only from every
/// caller's perspective except `emit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source: String,
    pub event_type: String,
    pub agent_id: Option<String>,
    pub data: Option<serde_json::Value>,
    pub created_at: String,
}

/// Filters for `EventStore::query`. All fields are conjunctive; `None`
/// means "don't filter on this column".
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub source: Option<String>,
    pub agent_id: Option<String>,
    pub event_type: Option<String>,
    pub limit: usize,
}

impl EventQuery {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}
