use std::process::Command;
use std::sync::Arc;

use space_bridge::BridgeStore;
use space_core::SpaceConfig;
use space_events::EventStore;
use space_memory::MemoryStore;
use space_registry::RegistryStore;

use crate::error::Result;
use crate::identify::identify;
use crate::types::SleepSummary;

const ACTIVE_CHANNEL_LIMIT: usize = 5;

/// Pre-compaction hygiene (spec §4.9): checkpoint active channels,
/// uncommitted workspace changes, and a memory gap, then hand back the
/// summary the caller prints. When `check` is set, nothing is written —
/// the same summary is computed as a dry-run preview. Calls `identify`
/// first, as every identity-bearing command does, so the emitted
/// `"sleep"` event backs the next wake's `prior_sleep_count`.
pub fn sleep(
    config: &SpaceConfig,
    registry: &Arc<RegistryStore>,
    bridge: &Arc<BridgeStore>,
    memory: &Arc<MemoryStore>,
    events: &Arc<EventStore>,
    identity: &str,
    workspace_root: &std::path::Path,
    check: bool,
) -> Result<SleepSummary> {
    identify(config, registry, events, identity, "sleep")?;

    let agent_id = registry.ensure_agent(identity)?;

    let active_channels: Vec<String> = bridge
        .fetch_channels(Some(&agent_id), None, false, true)?
        .into_iter()
        .take(ACTIVE_CHANNEL_LIMIT)
        .map(|c| c.name)
        .collect();

    if !check {
        for channel in &active_channels {
            memory.add_entry(
                &agent_id,
                "bridge-context",
                &format!("Active channel: {channel}"),
                false,
                "checkpoint",
                Some(channel),
                None,
            )?;
        }
    }

    let git_status = git_porcelain_status(workspace_root);
    if !check {
        if let Some(status) = &git_status {
            memory.add_entry(
                &agent_id,
                "git-status",
                "Uncommitted changes detected.",
                false,
                "checkpoint",
                None,
                Some(status),
            )?;
        }
    }

    let memory_entries = memory.get_memories(identity, None, false, None)?.len() as i64;
    let memory_gap = memory_entries == 0;
    if !check && memory_gap {
        memory.add_entry(
            &agent_id,
            "memory-gap",
            "No memory entries found for this identity.",
            false,
            "checkpoint",
            None,
            None,
        )?;
    }

    Ok(SleepSummary {
        identity: identity.to_string(),
        active_channels,
        memory_entries,
        uncommitted_changes: git_status.is_some(),
        memory_gap,
        checked_only: check,
    })
}

fn git_porcelain_status(workspace_root: &std::path::Path) -> Option<String> {
    let output = Command::new("git").arg("status").arg("--porcelain").current_dir(workspace_root).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!stdout.is_empty()).then_some(stdout)
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
    fn sleep_detects_memory_gap_and_writes_checkpoint() {
        let (registry, bridge, memory, events) = stores();
        let dir = tempfile::tempdir().unwrap();

        let summary =
            sleep(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1", dir.path(), false)
                .unwrap();
        assert!(summary.memory_gap);
        assert_eq!(summary.memory_entries, 1);
        assert!(!summary.checked_only);
    }

    #[test]
    fn sleep_check_mode_does_not_persist() {
        let (registry, bridge, memory, events) = stores();
        let dir = tempfile::tempdir().unwrap();

        let summary =
            sleep(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1", dir.path(), true)
                .unwrap();
        assert!(summary.memory_gap);
        assert!(summary.checked_only);

        let agent_id = registry.get_agent_id("scout-1").unwrap().unwrap();
        assert!(memory.get_memories("scout-1", None, false, None).unwrap().is_empty());
        let _ = agent_id;
    }

    #[test]
    fn sleep_emits_sleep_event_counted_by_next_wake() {
        let (registry, bridge, memory, events) = stores();
        let dir = tempfile::tempdir().unwrap();

        sleep(&SpaceConfig::default(), &registry, &bridge, &memory, &events, "scout-1", dir.path(), false).unwrap();
        let agent_id = registry.get_agent_id("scout-1").unwrap().unwrap();

        let sleeps = events.count_by_type(&agent_id, "sleep").unwrap();
        assert_eq!(sleeps, 1);
    }
}
