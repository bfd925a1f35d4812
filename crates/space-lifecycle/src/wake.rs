use std::sync::Arc;

use serde_json::json;

use space_bridge::BridgeStore;
use space_core::SpaceConfig;
use space_events::{EventQuery, EventStore};
use space_memory::MemoryStore;
use space_registry::RegistryStore;

use crate::error::Result;
use crate::identify::identify;
use crate::types::Orientation;

const RECENT_ENTRY_LIMIT: i64 = 10;
const RECENT_ENTRY_DAYS: i64 = 7;
const SENT_MESSAGE_LIMIT: usize = 5;

/// Ensure the agent exists, auto-close any prior open session, open a new
/// one, and assemble its orientation payload (spec §4.9). Calls
/// `identify` first, as every identity-bearing command does — this is
/// what backs `prior_sleep_count`'s `"sleep"` event lookup below.
pub fn wake(
    config: &SpaceConfig,
    registry: &Arc<RegistryStore>,
    bridge: &Arc<BridgeStore>,
    memory: &Arc<MemoryStore>,
    events: &Arc<EventStore>,
    identity: &str,
) -> Result<Orientation> {
    identify(config, registry, events, identity, "wake")?;

    let agent_id = registry.ensure_agent(identity)?;

    let prior_sleep_count = events.count_by_type(&agent_id, "sleep")?;
    let first_boot = events.count_by_type(&agent_id, "session_start")? == 0;

    let open_sessions = events.query(
        &EventQuery::new().source("session").agent_id(agent_id.clone()).event_type("session_start"),
    )?;
    let closed_sessions = events.query(
        &EventQuery::new().source("session").agent_id(agent_id.clone()).event_type("session_end"),
    )?;
    if open_sessions.len() > closed_sessions.len() {
        events.emit("session", "session_end", Some(&agent_id), Some(json!({ "reason": "auto_closed" })))?;
    }
    events.emit("session", "session_start", Some(&agent_id), None)?;

    let last_checkpoint = memory
        .get_memories(identity, None, false, None)?
        .into_iter()
        .find(|m| m.source == "checkpoint");

    let unread_channels = bridge.fetch_channels(Some(&agent_id), None, false, true)?;

    let core_memories = memory.get_core_entries(identity)?;
    let recent_entries = memory.get_recent_entries(identity, RECENT_ENTRY_DAYS, RECENT_ENTRY_LIMIT)?;
    let recent_sent_messages = bridge.get_sender_history(&agent_id, SENT_MESSAGE_LIMIT)?;

    Ok(Orientation {
        identity: identity.to_string(),
        first_boot,
        prior_sleep_count,
        last_checkpoint,
        unread_channels,
        core_memories,
        recent_entries,
        recent_sent_messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (Arc<RegistryStore>, Arc<BridgeStore>, Arc<MemoryStore>, Arc<EventStore>) {
        let registry = Arc::new(RegistryStore::open_in_memory().unwrap());
        let events = Arc::new(EventStore::open_in_memory().unwrap());
        let bridge = Arc::new(BridgeStore::open_in_memory().unwrap());
        let memory = Arc::new(MemoryStore::open_in_memory(events.clone(), registry.clone()).unwrap());
        (registry, bridge, memory, events)
    }

    #[test]
    fn first_wake_is_first_boot_with_no_prior_sleeps() {
        let (registry, bridge, memory, events) = stores();
        let orientation = wake(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1").unwrap();
        assert!(orientation.first_boot);
        assert_eq!(orientation.prior_sleep_count, 0);
    }

    #[test]
    fn second_wake_auto_closes_prior_session() {
        let (registry, bridge, memory, events) = stores();
        wake(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1").unwrap();
        let agent_id = registry.get_agent_id("scout-1").unwrap().unwrap();

        let orientation = wake(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1").unwrap();
        assert!(!orientation.first_boot);

        let ends = events
            .query(&EventQuery::new().source("session").agent_id(agent_id.clone()).event_type("session_end"))
            .unwrap();
        assert_eq!(ends.len(), 1);
        let starts = events
            .query(&EventQuery::new().source("session").agent_id(agent_id).event_type("session_start"))
            .unwrap();
        assert_eq!(starts.len(), 2);
    }

    #[test]
    fn wake_surfaces_last_checkpoint() {
        let (registry, bridge, memory, events) = stores();
        let agent_id = registry.ensure_agent("scout-1").unwrap();
        memory.add_entry(&agent_id, "bridge-context", "Active channel: ops", false, "checkpoint", Some("ops"), None).unwrap();

        let orientation = wake(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1").unwrap();
        assert!(orientation.last_checkpoint.is_some());
        assert_eq!(orientation.last_checkpoint.unwrap().source, "checkpoint");
    }
}
