use std::sync::Arc;
use std::time::Duration;

use space_bridge::BridgeStore;
use space_core::config::WorkerConfig;
use space_core::types::{AgentId, MessagePriority};
use tracing::instrument;

use crate::prompt::spawn_from_mention;
use crate::spawn::run_spawn;
use crate::types::WorkerResult;

/// Parse `content` for mentions and fan one subprocess out per mentioned
/// identity, each bounded by its own timeout and posting its own reply —
/// the parent never awaits the replies, only the spawn outcomes (spec
/// §4.6, §5: "the caller (bus) returns immediately after triggering").
///
/// A message authored by `AgentId::SYSTEM` never dispatches any worker,
/// breaking the system-reply -> mention -> system-reply loop (spec §8
/// property 7).
#[instrument(skip(bridge, content, config), fields(channel = %channel_name))]
pub async fn dispatch_mentions(
    bridge: Arc<BridgeStore>,
    channel_id: String,
    channel_name: String,
    content: String,
    sender_agent_id: String,
    config: WorkerConfig,
) -> Vec<WorkerResult> {
    if sender_agent_id == AgentId::SYSTEM {
        return Vec::new();
    }

    let mentions = space_bridge::parse_mentions(&content);
    if mentions.is_empty() {
        return Vec::new();
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let mut handles = Vec::with_capacity(mentions.len());

    for identity in mentions {
        let bridge = Arc::clone(&bridge);
        let channel_id = channel_id.clone();
        let channel_name = channel_name.clone();
        let content = content.clone();
        let spawn_command = config.spawn_command.clone();
        let max_stdout_bytes = config.max_stdout_bytes;

        handles.push(tokio::spawn(async move {
            let prompt = spawn_from_mention(&identity, &channel_name, &content);
            let result = run_spawn(&spawn_command, &identity, &prompt, &channel_name, timeout, max_stdout_bytes).await;
            post_if_successful(&bridge, &channel_id, result)
        }));
    }

    // Overall deadline a little past the per-mention timeout: a handful
    // of slow subprocesses shouldn't drag the join out indefinitely.
    let overall_deadline = timeout + Duration::from_secs(2);
    let joined = tokio::time::timeout(overall_deadline, futures_join_all(handles)).await;

    match joined {
        Ok(results) => results,
        Err(_) => Vec::new(),
    }
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<WorkerResult>>) -> Vec<WorkerResult> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(_) => continue,
        }
    }
    results
}

fn post_if_successful(bridge: &BridgeStore, channel_id: &str, result: WorkerResult) -> WorkerResult {
    match result {
        WorkerResult::Success { identity, output } => {
            match bridge.create_message(channel_id, &identity, &output, MessagePriority::Normal) {
                Ok(message_id) => WorkerResult::Posted { identity, message_id },
                Err(e) => WorkerResult::Failed { identity, reason: format!("post failed: {e}") },
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_author_never_dispatches() {
        let bridge = Arc::new(BridgeStore::open_in_memory().unwrap());
        let channel_id = bridge.resolve_channel_id("ops").unwrap();
        let results = dispatch_mentions(
            bridge,
            channel_id,
            "ops".to_string(),
            "@zealot-2 handled, see above".to_string(),
            AgentId::SYSTEM.to_string(),
            WorkerConfig::default(),
        )
        .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn no_mentions_dispatches_nothing() {
        let bridge = Arc::new(BridgeStore::open_in_memory().unwrap());
        let channel_id = bridge.resolve_channel_id("ops").unwrap();
        let results = dispatch_mentions(
            bridge,
            channel_id,
            "ops".to_string(),
            "no mentions here".to_string(),
            "some-agent".to_string(),
            WorkerConfig::default(),
        )
        .await;
        assert!(results.is_empty());
    }
}
