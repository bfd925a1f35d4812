use std::collections::HashSet;
use std::sync::Arc;

use space_bridge::BridgeStore;
use space_events::EventStore;
use space_knowledge::KnowledgeStore;
use space_memory::MemoryStore;
use space_registry::RegistryStore;

use crate::error::Result;
use crate::types::{BridgeHit, ContextResult, CurrentState, KnowledgeHit, MemoryHit, TimelineEntry};

const TIMELINE_LIMIT: usize = 10;

/// Unified topic retrieval (spec §4.10): recent evolution across every
/// store, non-archived current-state matches, and any canon doc whose
/// name mentions the topic, grounded in `context.py`.
pub fn context(
    registry: &Arc<RegistryStore>,
    bridge: &Arc<BridgeStore>,
    memory: &Arc<MemoryStore>,
    knowledge: &Arc<KnowledgeStore>,
    events: &Arc<EventStore>,
    canon_dir: &std::path::Path,
    topic: &str,
    identity: Option<&str>,
) -> Result<ContextResult> {
    let scope_agent_id = match identity {
        Some(identity) => registry.get_agent_id(identity)?,
        None => None,
    };
    let scope = scope_agent_id.as_deref();

    let timeline = collect_timeline(registry, bridge, memory, knowledge, events, topic, scope)?;
    let current_state = collect_current_state(registry, bridge, memory, knowledge, topic, scope)?;
    let canon_docs = search_canon(canon_dir, topic);

    Ok(ContextResult { timeline, current_state, canon_docs })
}

fn collect_timeline(
    registry: &Arc<RegistryStore>,
    bridge: &Arc<BridgeStore>,
    memory: &Arc<MemoryStore>,
    knowledge: &Arc<KnowledgeStore>,
    events: &Arc<EventStore>,
    topic: &str,
    scope: Option<&str>,
) -> Result<Vec<TimelineEntry>> {
    let mut entries = Vec::new();
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();

    for event in events.search(topic, scope)? {
        let data = event.data.as_ref().map(|v| v.to_string()).unwrap_or_default();
        let key = (data.clone(), event.agent_id.clone());
        if !seen.insert(key) {
            continue;
        }
        let identity = match &event.agent_id {
            Some(id) => resolve_name(registry, id)?,
            None => None,
        };
        entries.push(TimelineEntry {
            source: "events".to_string(),
            label: format!("{}.{}", event.source, event.event_type),
            identity,
            data,
            timestamp: event.created_at,
        });
    }

    for entry in memory.search_all(topic, scope)? {
        let key = (entry.message.clone(), Some(entry.agent_id.clone()));
        if !seen.insert(key) {
            continue;
        }
        let identity = resolve_name(registry, &entry.agent_id)?;
        entries.push(TimelineEntry {
            source: "memory".to_string(),
            label: entry.topic,
            identity,
            data: entry.message,
            timestamp: entry.created_at,
        });
    }

    for entry in knowledge.search_all(topic, scope)? {
        let key = (entry.content.clone(), Some(entry.agent_id.clone()));
        if !seen.insert(key) {
            continue;
        }
        let identity = resolve_name(registry, &entry.agent_id)?;
        entries.push(TimelineEntry {
            source: "knowledge".to_string(),
            label: entry.domain,
            identity,
            data: entry.content,
            timestamp: entry.created_at,
        });
    }

    for (channel_name, message) in bridge.search_messages(topic, scope)? {
        let key = (message.content.clone(), Some(message.agent_id.clone()));
        if !seen.insert(key) {
            continue;
        }
        let identity = resolve_name(registry, &message.agent_id)?;
        entries.push(TimelineEntry {
            source: "bridge".to_string(),
            label: channel_name,
            identity,
            data: message.content,
            timestamp: message.created_at,
        });
    }

    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    if entries.len() > TIMELINE_LIMIT {
        entries.drain(0..entries.len() - TIMELINE_LIMIT);
    }
    Ok(entries)
}

fn collect_current_state(
    registry: &Arc<RegistryStore>,
    bridge: &Arc<BridgeStore>,
    memory: &Arc<MemoryStore>,
    knowledge: &Arc<KnowledgeStore>,
    topic: &str,
    scope: Option<&str>,
) -> Result<CurrentState> {
    let mut state = CurrentState::default();

    for entry in memory.search_all(topic, scope)? {
        let identity = resolve_name(registry, &entry.agent_id)?.unwrap_or(entry.agent_id);
        state.memory.push(MemoryHit { identity, topic: entry.topic, message: entry.message });
    }

    for entry in knowledge.search_all(topic, scope)? {
        let contributor = resolve_name(registry, &entry.agent_id)?.unwrap_or(entry.agent_id);
        state.knowledge.push(KnowledgeHit { domain: entry.domain, content: entry.content, contributor });
    }

    for (channel_name, message) in bridge.search_messages(topic, scope)? {
        let sender = resolve_name(registry, &message.agent_id)?.unwrap_or(message.agent_id);
        state.bridge.push(BridgeHit { channel: channel_name, sender, content: message.content });
    }

    Ok(state)
}

fn resolve_name(registry: &Arc<RegistryStore>, agent_id: &str) -> Result<Option<String>> {
    Ok(registry.get_agent_name(agent_id)?)
}

fn search_canon(canon_dir: &std::path::Path, topic: &str) -> std::collections::HashMap<String, String> {
    let mut out = std::collections::HashMap::new();
    let Ok(entries) = std::fs::read_dir(canon_dir) else {
        return out;
    };
    let topic_lower = topic.to_lowercase();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if name.to_lowercase().contains(&topic_lower) {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    out.insert(name, content);
                }
            }
        }
    }
    out
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
    fn context_collects_memory_and_canon_hits() {
        let (registry, bridge, memory, knowledge, events) = stores();
        let agent_id = registry.ensure_agent("scout-1").unwrap();
        memory.add_entry(&agent_id, "deploys", "canary rollout plan", false, "manual", None, None).unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploys.md"), "# Deploys\ncanary details").unwrap();

        let result =
            context(&registry, &bridge, &memory, &knowledge, &events, dir.path(), "deploys", None).unwrap();
        assert_eq!(result.current_state.memory.len(), 1);
        assert!(result.canon_docs.contains_key("deploys.md"));
    }

    #[test]
    fn context_scopes_to_identity_when_given() {
        let (registry, bridge, memory, knowledge, events) = stores();
        let a1 = registry.ensure_agent("scout-1").unwrap();
        let a2 = registry.ensure_agent("scout-2").unwrap();
        memory.add_entry(&a1, "deploys", "canary rollout", false, "manual", None, None).unwrap();
        memory.add_entry(&a2, "deploys", "canary rollback", false, "manual", None, None).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let result = context(&registry, &bridge, &memory, &knowledge, &events, dir.path(), "deploys", Some("scout-1"))
            .unwrap();
        assert_eq!(result.current_state.memory.len(), 1);
        assert_eq!(result.current_state.memory[0].identity, "scout-1");
    }
}
