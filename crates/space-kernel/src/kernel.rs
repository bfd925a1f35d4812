use std::sync::Arc;

use space_bridge::BridgeStore;
use space_core::types::MessagePriority;
use space_core::SpaceConfig;
use space_events::EventStore;
use space_knowledge::KnowledgeStore;
use space_lifecycle::{Orientation, SleepSummary};
use space_memory::MemoryStore;
use space_ops::OpsStore;
use space_registry::RegistryStore;
use space_stats::{AgentStats, ContextResult};
use space_worker::WorkerResult;
use tracing::instrument;

use crate::error::Result;

/// Wires every subsystem store to a single workspace root and exposes
/// the orchestration entry points (`identify`/`wake`/`sleep`, the
/// message bus, stats/context) that a launcher process calls into. Not
/// a CLI — callers provide identities and content directly.
pub struct Kernel {
    pub config: SpaceConfig,
    pub registry: Arc<RegistryStore>,
    pub bridge: Arc<BridgeStore>,
    pub memory: Arc<MemoryStore>,
    pub knowledge: Arc<KnowledgeStore>,
    pub events: Arc<EventStore>,
    pub ops: Arc<OpsStore>,
}

impl Kernel {
    /// Open every per-purpose database under `config.store_dir()`,
    /// creating the directory and running migrations as needed.
    pub fn open(config: SpaceConfig) -> Result<Self> {
        let store_dir = config.store_dir();
        std::fs::create_dir_all(&store_dir)?;

        let events = Arc::new(EventStore::open(&store_dir.join(&config.database.events_db))?);
        let registry = Arc::new(RegistryStore::open(&store_dir.join(&config.database.registry_db))?);
        let bridge = Arc::new(BridgeStore::open(&store_dir.join(&config.database.bridge_db))?);
        let memory = Arc::new(MemoryStore::open(
            &store_dir.join(&config.database.memory_db),
            Arc::clone(&events),
            Arc::clone(&registry),
        )?);
        let knowledge = Arc::new(KnowledgeStore::open(
            &store_dir.join(&config.database.knowledge_db),
            Arc::clone(&events),
        )?);
        let ops = Arc::new(OpsStore::open(&store_dir.join(&config.database.ops_db))?);

        Ok(Self { config, registry, bridge, memory, knowledge, events, ops })
    }

    /// An in-memory kernel for tests and short-lived callers.
    pub fn open_in_memory(config: SpaceConfig) -> Result<Self> {
        let events = Arc::new(EventStore::open_in_memory()?);
        let registry = Arc::new(RegistryStore::open_in_memory()?);
        let bridge = Arc::new(BridgeStore::open_in_memory()?);
        let memory = Arc::new(MemoryStore::open_in_memory(Arc::clone(&events), Arc::clone(&registry))?);
        let knowledge = Arc::new(KnowledgeStore::open_in_memory(Arc::clone(&events))?);
        let ops = Arc::new(OpsStore::open_in_memory()?);

        Ok(Self { config, registry, bridge, memory, knowledge, events, ops })
    }

    #[instrument(skip(self, identity))]
    pub fn identify(&self, identity: &str, command: &str) -> Result<Option<String>> {
        Ok(space_lifecycle::identify(&self.config, &self.registry, &self.events, identity, command)?)
    }

    #[instrument(skip(self, identity))]
    pub fn wake(&self, identity: &str) -> Result<Orientation> {
        Ok(space_lifecycle::wake(&self.config, &self.registry, &self.bridge, &self.memory, &self.events, identity)?)
    }

    #[instrument(skip(self, identity))]
    pub fn sleep(&self, identity: &str, check: bool) -> Result<SleepSummary> {
        Ok(space_lifecycle::sleep(
            &self.config,
            &self.registry,
            &self.bridge,
            &self.memory,
            &self.events,
            identity,
            &self.config.workspace_root,
            check,
        )?)
    }

    pub fn stats(&self) -> Result<Vec<AgentStats>> {
        Ok(space_stats::stats(&self.registry, &self.bridge, &self.memory, &self.knowledge, &self.events)?)
    }

    pub fn context(&self, topic: &str, identity: Option<&str>) -> Result<ContextResult> {
        Ok(space_stats::context(
            &self.registry,
            &self.bridge,
            &self.memory,
            &self.knowledge,
            &self.events,
            &self.config.canon_dir(),
            topic,
            identity,
        )?)
    }

    /// The channel bus (spec §4.5/§4.6): post a message, then — if it
    /// carries any non-`system` `@mention`s — fan the mention worker out
    /// as a detached task and return immediately without waiting for its
    /// replies. This is the one call site that bridges `space-bridge`
    /// (message storage) and `space-worker` (subprocess fan-out); neither
    /// depends on the other so the wiring lives here.
    #[instrument(skip(self, content))]
    pub fn send_message(
        &self,
        channel_id: &str,
        agent_id: &str,
        content: &str,
        priority: MessagePriority,
    ) -> Result<String> {
        let message_id = self.bridge.create_message(channel_id, agent_id, content, priority)?;

        if agent_id != space_core::types::AgentId::SYSTEM && !space_bridge::parse_mentions(content).is_empty() {
            let bridge = Arc::clone(&self.bridge);
            let channel_id = channel_id.to_string();
            let channel_name = self.bridge.get_channel_name(&channel_id)?;
            let content = content.to_string();
            let agent_id = agent_id.to_string();
            let worker_config = self.config.worker.clone();

            tokio::spawn(async move {
                let results: Vec<WorkerResult> =
                    space_worker::dispatch_mentions(bridge, channel_id, channel_name, content, agent_id, worker_config)
                        .await;
                for result in &results {
                    tracing::debug!(?result, "mention worker finished");
                }
            });
        }

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_message_without_mentions_does_not_dispatch() {
        let kernel = Kernel::open_in_memory(SpaceConfig::default()).unwrap();
        let channel_id = kernel.bridge.resolve_channel_id("space-dev").unwrap();
        let agent_id = kernel.registry.ensure_agent("zealot-1").unwrap();

        let message_id = kernel
            .send_message(&channel_id, &agent_id, "no mentions here", MessagePriority::Normal)
            .unwrap();
        assert!(!message_id.is_empty());
    }

    #[test]
    fn identify_wake_sleep_roundtrip_without_constitution() {
        let kernel = Kernel::open_in_memory(SpaceConfig::default()).unwrap();
        // No constitution configured for this role, so no hash comes back.
        assert!(kernel.identify("zealot-1", "wake").unwrap().is_none());

        let orientation = kernel.wake("zealot-1").unwrap();
        assert!(orientation.first_boot);

        let summary = kernel.sleep("zealot-1", true).unwrap();
        assert!(summary.active_channels.is_empty());
    }
}
