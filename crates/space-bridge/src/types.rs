use serde::{Deserialize, Serialize};
use space_core::types::MessagePriority;

/// A channel-bus message (spec §3's `Message`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub agent_id: String,
    pub content: String,
    pub priority: MessagePriority,
    pub created_at: String,
}

/// An annotation attached to a channel, outside the message stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub channel_id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
}

/// Aggregated view of a channel for listing (spec §4.5's `ChannelView`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelView {
    pub channel_id: String,
    pub name: String,
    pub topic: Option<String>,
    pub created_at: String,
    pub archived_at: Option<String>,
    pub participants: Vec<String>,
    pub message_count: i64,
    pub last_activity: Option<String>,
    /// `None` when no `agent_id` was supplied to `fetch_channels`.
    pub unread_count: Option<i64>,
    pub notes_count: i64,
}

/// Result of `recv_updates`: the unread messages, how many there were, the
/// channel's current topic, and its participant set — read and the
/// bookmark advance happen atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecvUpdates {
    pub messages: Vec<Message>,
    pub count: usize,
    pub topic: Option<String>,
    pub participants: Vec<String>,
}

/// Outcome of `rename_channel` (spec §4.5's 4-way result).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    NotFound,
    /// `new_name` is already in use by a different active channel.
    Conflict,
    /// `new_name` is in use, but by an *archived* channel — distinguished
    /// from `Conflict` so a caller can offer to restore it instead
    /// (`bridge/db.py::rename_channel`'s `"archived"` sentinel).
    ConflictArchived,
}

/// Full export of a channel: metadata plus its messages and notes
/// interleaved by time (spec §4.5's `get_export_data`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelExport {
    pub channel_id: String,
    pub name: String,
    pub topic: Option<String>,
    pub created_at: String,
    pub archived_at: Option<String>,
    pub messages: Vec<Message>,
    pub notes: Vec<Note>,
}
