use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use space_bridge::BridgeStore;
use space_events::EventStore;
use space_knowledge::KnowledgeStore;
use space_memory::MemoryStore;
use space_registry::RegistryStore;

use crate::error::Result;
use crate::types::AgentStats;

/// Cross-store usage aggregation (spec §4.10): the discovery set is the
/// union of registered, non-archived agents with every distinct
/// `agent_id` seen in events/messages/memory/knowledge, so orphaned
/// agents (used in logs, never registered) still appear, per
/// `analytics.py::_show_usage_by_agent`.
pub fn stats(
    registry: &Arc<RegistryStore>,
    bridge: &Arc<BridgeStore>,
    memory: &Arc<MemoryStore>,
    knowledge: &Arc<KnowledgeStore>,
    events: &Arc<EventStore>,
) -> Result<Vec<AgentStats>> {
    let msgs = bridge.message_count_by_agent()?;
    let mems = memory.count_by_agent()?;
    let knows = knowledge.count_by_agent()?;

    let mut discovered: HashSet<String> = HashSet::new();
    discovered.extend(registry.list_active_agent_ids()?);
    discovered.extend(bridge.distinct_senders()?);
    discovered.extend(memory.distinct_agent_ids()?);
    discovered.extend(knowledge.distinct_agent_ids()?);
    discovered.extend(events.distinct_agent_ids()?);

    let mut out = Vec::with_capacity(discovered.len());
    for agent_id in discovered {
        let name = registry.get_agent_name(&agent_id)?;
        let event_count = events_total(events, &agent_id)?;
        let spawns = events.count_by_type(&agent_id, "session_start")?;
        out.push(AgentStats {
            msgs: *msgs.get(&agent_id).unwrap_or(&0),
            mems: *mems.get(&agent_id).unwrap_or(&0),
            knows: *knows.get(&agent_id).unwrap_or(&0),
            events: event_count,
            spawns,
            name,
            agent_id,
        });
    }
    out.sort_by(|a, b| b.spawns.cmp(&a.spawns).then_with(|| a.agent_id.cmp(&b.agent_id)));
    Ok(out)
}

fn events_total(events: &Arc<EventStore>, agent_id: &str) -> Result<i64> {
    let filter = space_events::EventQuery { agent_id: Some(agent_id.to_string()), limit: usize::MAX, ..Default::default() };
    Ok(events.query(&filter)?.len() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (Arc<RegistryStore>, Arc<BridgeStore>, Arc<MemoryStore>, Arc<KnowledgeStore>, Arc<EventStore>) {
        let registry = Arc::new(RegistryStore::open_in_memory().unwrap());
        let events = Arc::new(EventStore::open_in_memory().unwrap());
        let bridge = Arc::new(BridgeStore::open_in_memory().unwrap());
        let memory = Arc::new(MemoryStore::open_in_memory(events.clone(), registry.clone()).unwrap());
        let knowledge = Arc::new(KnowledgeStore::open_in_memory(events.clone()).unwrap());
        (registry, bridge, memory, knowledge, events)
    }

    #[test]
    fn stats_surfaces_orphaned_agent() {
        let (registry, bridge, memory, knowledge, events) = stores();
        let ch = bridge.create_channel("ops", None).unwrap();
        bridge
            .create_message(&ch, "ghost-agent", "hi", space_core::types::MessagePriority::Normal)
            .unwrap();

        let rows = stats(&registry, &bridge, &memory, &knowledge, &events).unwrap();
        let ghost = rows.iter().find(|r| r.agent_id == "ghost-agent").unwrap();
        assert_eq!(ghost.msgs, 1);
        assert!(ghost.name.is_none());
    }

    #[test]
    fn stats_counts_registered_agent_across_stores() {
        let (registry, bridge, memory, knowledge, events) = stores();
        let agent_id = registry.ensure_agent("scout-1").unwrap();
        memory.add_entry(&agent_id, "t", "m", false, "manual", None, None).unwrap();
        knowledge.write_knowledge("deploys", &agent_id, "c", None).unwrap();

        let rows = stats(&registry, &bridge, &memory, &knowledge, &events).unwrap();
        let row = rows.iter().find(|r| r.agent_id == agent_id).unwrap();
        assert_eq!(row.name.as_deref(), Some("scout-1"));
        assert_eq!(row.mems, 1);
        assert_eq!(row.knows, 1);
    }
}
