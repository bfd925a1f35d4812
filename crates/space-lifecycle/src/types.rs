use serde::{Deserialize, Serialize};

use space_bridge::ChannelView;
use space_bridge::Message;
use space_memory::Memory;

/// Assembled on `wake` from across the stores (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orientation {
    pub identity: String,
    /// `true` when this is the agent's very first wake (no prior
    /// `session_start` events) — callers show a first-boot message.
    pub first_boot: bool,
    pub prior_sleep_count: i64,
    pub last_checkpoint: Option<Memory>,
    pub unread_channels: Vec<ChannelView>,
    pub core_memories: Vec<Memory>,
    pub recent_entries: Vec<Memory>,
    pub recent_sent_messages: Vec<Message>,
}

/// Returned by `sleep`; `json_summary` is the JSON-mode rendering of the
/// same pre-compaction summary `sleep.py` prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepSummary {
    pub identity: String,
    pub active_channels: Vec<String>,
    pub memory_entries: i64,
    pub uncommitted_changes: bool,
    pub memory_gap: bool,
    /// `true` when run with `--check`: the summary was computed but no
    /// checkpoint memory rows were written.
    pub checked_only: bool,
}

pub const SLEEP_CHECKLIST: &str = "\
✓ Before you go:
  1. Extract signal → memory/knowledge
  2. Archive stale entries
  3. Mark channels read: bridge recv <channel> --as <identity>
  4. Log blockers
  5. Reflect: bridge send space-feedback <reflection> --as <identity>

💀 Clean death. Next self thanks you.";
