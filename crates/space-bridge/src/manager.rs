use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use space_core::types::MessagePriority;
use tracing::instrument;

use crate::db::{MIGRATIONS, SUMMARY_CHANNEL};
use crate::error::{BridgeError, Result};
use crate::types::{ChannelExport, ChannelView, Message, Note, RecvUpdates, RenameOutcome};

/// The channel message bus (spec §4.5), grounded in `bridge/db.py`.
pub struct BridgeStore {
    db: Mutex<Connection>,
}

impl BridgeStore {
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = space_store::open(path)?;
        space_store::apply_migrations(&mut conn, MIGRATIONS)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// An in-process store backed by SQLite's `:memory:` database, for
    /// tests and other in-process callers that don't need durability.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        space_store::apply_migrations(&mut conn, MIGRATIONS)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Look up `name`'s channel id, creating the channel if it doesn't
    /// exist yet — channels are created implicitly on first reference
    /// (spec §3, §4.5).
    #[instrument(skip(self))]
    pub fn resolve_channel_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.get_channel_id(name)? {
            return Ok(id);
        }
        self.create_channel(name, None)
    }

    /// Explicitly create a new active channel named `name`.
    pub fn create_channel(&self, name: &str, topic: Option<&str>) -> Result<String> {
        let id = space_ids::uuid7();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO channels (id, name, topic, created_at, archived_at)
             VALUES (?1, ?2, ?3, datetime('now'), NULL)",
            params![id, name, topic],
        )?;
        Ok(id)
    }

    /// Look up an *active* channel's id by name.
    pub fn get_channel_id(&self, name: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let id = db
            .query_row(
                "SELECT id FROM channels WHERE name = ?1 AND archived_at IS NULL",
                [name],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn get_channel_name(&self, channel_id: &str) -> Result<String> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT name FROM channels WHERE id = ?1", [channel_id], |r| r.get(0))
            .optional()?
            .ok_or_else(|| BridgeError::ChannelNotFound(channel_id.to_string()))
    }

    pub fn get_channel_topic(&self, channel_id: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let topic: Option<String> = db
            .query_row("SELECT topic FROM channels WHERE id = ?1", [channel_id], |r| r.get(0))
            .optional()?
            .ok_or_else(|| BridgeError::ChannelNotFound(channel_id.to_string()))?;
        Ok(topic)
    }

    /// Only sets the topic if it is currently unset (`NULL` or empty) —
    /// subsequent calls against a channel with a topic are no-ops
    /// (`bridge/db.py::set_topic`).
    pub fn set_topic(&self, channel_id: &str, topic: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE channels SET topic = ?2
             WHERE id = ?1 AND (topic IS NULL OR topic = '')",
            params![channel_id, topic],
        )?;
        Ok(())
    }

    /// Rename `old` to `new`. Never changes `channel_id` — every
    /// message/bookmark/note referencing the channel stays intact
    /// (spec §8 property 8).
    #[instrument(skip(self))]
    pub fn rename_channel(&self, old: &str, new: &str) -> Result<RenameOutcome> {
        let db = self.db.lock().unwrap();

        let old_id: Option<String> = db
            .query_row(
                "SELECT id FROM channels WHERE name = ?1 AND archived_at IS NULL",
                [old],
                |r| r.get(0),
            )
            .optional()?;
        let Some(old_id) = old_id else {
            return Ok(RenameOutcome::NotFound);
        };

        let conflict: Option<bool> = db
            .query_row(
                "SELECT archived_at IS NOT NULL FROM channels WHERE name = ?1",
                [new],
                |r| r.get(0),
            )
            .optional()?;
        match conflict {
            Some(false) => return Ok(RenameOutcome::Conflict),
            Some(true) => return Ok(RenameOutcome::ConflictArchived),
            None => {}
        }

        db.execute("UPDATE channels SET name = ?2 WHERE id = ?1", params![old_id, new])?;
        Ok(RenameOutcome::Renamed)
    }

    pub fn archive_channel(&self, channel_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE channels SET archived_at = datetime('now')
             WHERE id = ?1 AND archived_at IS NULL",
            [channel_id],
        )?;
        if rows == 0 {
            return Err(BridgeError::ChannelNotFound(channel_id.to_string()));
        }
        Ok(())
    }

    /// Hard delete: cascades to messages, bookmarks, and notes.
    pub fn delete_channel(&self, channel_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM messages WHERE channel_id = ?1", [channel_id])?;
        db.execute("DELETE FROM bookmarks WHERE channel_id = ?1", [channel_id])?;
        db.execute("DELETE FROM notes WHERE channel_id = ?1", [channel_id])?;
        let rows = db.execute("DELETE FROM channels WHERE id = ?1", [channel_id])?;
        if rows == 0 {
            return Err(BridgeError::ChannelNotFound(channel_id.to_string()));
        }
        Ok(())
    }

    /// Append a message; channel creation is the caller's responsibility
    /// via `resolve_channel_id` (mention fan-out happens one layer up, in
    /// `space-worker`, after this call commits — spec §4.5).
    pub fn create_message(
        &self,
        channel_id: &str,
        agent_id: &str,
        content: &str,
        priority: MessagePriority,
    ) -> Result<String> {
        let id = space_ids::uuid7();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO messages (id, channel_id, agent_id, content, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            params![id, channel_id, agent_id, content, priority.to_string()],
        )?;
        Ok(id)
    }

    /// Unread messages for `agent_id` in `channel_id`, from an active
    /// channel only. The `summary` channel always returns just its single
    /// latest message regardless of the bookmark (spec §9).
    pub fn get_new_messages(&self, channel_id: &str, agent_id: &str) -> Result<Vec<Message>> {
        let name = self.get_channel_name(channel_id)?;
        let db = self.db.lock().unwrap();

        if name == SUMMARY_CHANNEL {
            let mut stmt = db.prepare(
                "SELECT m.id, m.channel_id, m.agent_id, m.content, m.priority, m.created_at
                 FROM messages m
                 WHERE m.channel_id = ?1
                 ORDER BY m.id DESC LIMIT 1",
            )?;
            let rows = stmt.query_map([channel_id], row_to_message)?;
            return Ok(rows.filter_map(|r| r.ok()).collect());
        }

        let mut stmt = db.prepare(
            "SELECT m.id, m.channel_id, m.agent_id, m.content, m.priority, m.created_at
             FROM messages m
             JOIN channels c ON c.id = m.channel_id
             LEFT JOIN bookmarks b ON b.agent_id = ?2 AND b.channel_id = m.channel_id
             WHERE m.channel_id = ?1
               AND c.archived_at IS NULL
               AND m.id > COALESCE(b.last_seen_id, '')
             ORDER BY m.id ASC",
        )?;
        let rows = stmt.query_map(params![channel_id, agent_id], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Idempotent max-update: never moves the bookmark backwards
    /// (spec §8 property, invariant on `bookmarks`).
    pub fn set_bookmark(&self, agent_id: &str, channel_id: &str, last_seen_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO bookmarks (agent_id, channel_id, last_seen_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(agent_id, channel_id)
             DO UPDATE SET last_seen_id = MAX(last_seen_id, excluded.last_seen_id)",
            params![agent_id, channel_id, last_seen_id],
        )?;
        Ok(())
    }

    /// Read unread messages and advance the bookmark to the last returned
    /// id, atomically (spec §4.5, §8 property 1).
    #[instrument(skip(self))]
    pub fn recv_updates(&self, channel_id: &str, agent_id: &str) -> Result<RecvUpdates> {
        let messages = self.get_new_messages(channel_id, agent_id)?;
        if let Some(last) = messages.last() {
            self.set_bookmark(agent_id, channel_id, &last.id)?;
        }
        let topic = self.get_channel_topic(channel_id)?;
        let participants = self.get_participants(channel_id)?;
        Ok(RecvUpdates {
            count: messages.len(),
            messages,
            topic,
            participants,
        })
    }

    pub fn get_all_messages(&self, channel_id: &str) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, channel_id, agent_id, content, priority, created_at
             FROM messages WHERE channel_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([channel_id], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn get_sender_history(&self, agent_id: &str, limit: usize) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, channel_id, agent_id, content, priority, created_at
             FROM messages WHERE agent_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![agent_id, limit as i64], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Unread alert-priority messages across every *active* channel,
    /// respecting each channel's bookmark for `agent_id`. Archived
    /// channels are excluded (spec §8 property 6) — a deliberate
    /// divergence from the unfiltered original (see DESIGN.md).
    pub fn get_alerts(&self, agent_id: &str) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT m.id, m.channel_id, m.agent_id, m.content, m.priority, m.created_at
             FROM messages m
             JOIN channels c ON c.id = m.channel_id
             LEFT JOIN bookmarks b ON b.agent_id = ?1 AND b.channel_id = m.channel_id
             WHERE m.priority = 'alert'
               AND c.archived_at IS NULL
               AND (b.last_seen_id IS NULL OR m.id > b.last_seen_id)
             ORDER BY m.created_at DESC",
        )?;
        let rows = stmt.query_map([agent_id], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Per-sender message counts, for stats aggregation
    /// (`analytics.py::_show_usage_by_agent`).
    pub fn message_count_by_agent(&self) -> Result<std::collections::HashMap<String, i64>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT agent_id, COUNT(*) FROM messages GROUP BY agent_id")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Every distinct sender, including agents never registered —
    /// feeds the discovery-set union for stats (spec §4.10).
    pub fn distinct_senders(&self) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT DISTINCT agent_id FROM messages")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Channel-scoped substring search over message content or channel
    /// name, optionally scoped to a sender (`context.py`'s bridge leg).
    pub fn search_messages(
        &self,
        query_substr: &str,
        agent_id: Option<&str>,
    ) -> Result<Vec<(String, Message)>> {
        let db = self.db.lock().unwrap();
        let pattern = format!("%{query_substr}%");
        let mut sql = String::from(
            "SELECT c.name, m.id, m.channel_id, m.agent_id, m.content, m.priority, m.created_at
             FROM messages m JOIN channels c ON m.channel_id = c.id
             WHERE (m.content LIKE ?1 OR c.name LIKE ?1)",
        );
        if agent_id.is_some() {
            sql.push_str(" AND m.agent_id = ?2");
        }
        sql.push_str(" ORDER BY m.created_at ASC");
        let mut stmt = db.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, Message)> {
            Ok((
                row.get(0)?,
                Message {
                    id: row.get(1)?,
                    channel_id: row.get(2)?,
                    agent_id: row.get(3)?,
                    content: row.get(4)?,
                    priority: row.get::<_, String>(5)?.parse().unwrap_or_default(),
                    created_at: row.get(6)?,
                },
            ))
        };
        let rows = if let Some(agent_id) = agent_id {
            stmt.query_map(params![pattern, agent_id], map_row)?.filter_map(|r| r.ok()).collect()
        } else {
            stmt.query_map([&pattern], map_row)?.filter_map(|r| r.ok()).collect()
        };
        Ok(rows)
    }

    pub fn create_note(&self, channel_id: &str, author: &str, content: &str) -> Result<String> {
        let id = space_ids::uuid7();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO notes (note_id, channel_id, author, content, created_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))",
            params![id, channel_id, author, content],
        )?;
        Ok(id)
    }

    pub fn get_notes(&self, channel_id: &str) -> Result<Vec<Note>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT note_id, channel_id, author, content, created_at
             FROM notes WHERE channel_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([channel_id], row_to_note)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn get_participants(&self, channel_id: &str) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT DISTINCT agent_id FROM messages WHERE channel_id = ?1 ORDER BY agent_id",
        )?;
        let rows = stmt.query_map([channel_id], |r| r.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Listing query backing the `channels` command (spec §4.5). When
    /// `agent_id` is given, `unread_count` is populated via a per-row
    /// correlated subquery; otherwise it's `None`.
    pub fn fetch_channels(
        &self,
        agent_id: Option<&str>,
        time_filter: Option<&str>,
        include_archived: bool,
        unread_only: bool,
    ) -> Result<Vec<ChannelView>> {
        let db = self.db.lock().unwrap();
        let mut sql = String::from(
            "SELECT c.id, c.name, c.topic, c.created_at, c.archived_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.channel_id = c.id) AS message_count,
                    (SELECT MAX(m.created_at) FROM messages m WHERE m.channel_id = c.id) AS last_activity,
                    (SELECT COUNT(*) FROM notes n WHERE n.channel_id = c.id) AS notes_count",
        );
        if let Some(_agent_id) = agent_id {
            sql.push_str(
                ",
                    (SELECT COUNT(*) FROM messages m
                     LEFT JOIN bookmarks b ON b.agent_id = :agent_id AND b.channel_id = c.id
                     WHERE m.channel_id = c.id AND m.id > COALESCE(b.last_seen_id, '')) AS unread_count",
            );
        }
        sql.push_str(" FROM channels c WHERE 1=1");
        if !include_archived {
            sql.push_str(" AND c.archived_at IS NULL");
        }
        if time_filter.is_some() {
            sql.push_str(" AND c.created_at >= datetime('now', :time_filter)");
        }
        sql.push_str(" ORDER BY c.created_at DESC");

        let mut stmt = db.prepare(&sql)?;
        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> = Vec::new();
        if let Some(a) = &agent_id {
            named.push((":agent_id", a));
        }
        if let Some(t) = &time_filter {
            named.push((":time_filter", t));
        }

        let has_unread_col = agent_id.is_some();
        let mut views: Vec<ChannelView> = stmt
            .query_map(named.as_slice(), |row| {
                let channel_id: String = row.get(0)?;
                let unread_count: Option<i64> = if has_unread_col { row.get(8)? } else { None };
                Ok(ChannelView {
                    channel_id,
                    name: row.get(1)?,
                    topic: row.get(2)?,
                    created_at: row.get(3)?,
                    archived_at: row.get(4)?,
                    participants: Vec::new(),
                    message_count: row.get(5)?,
                    last_activity: row.get(6)?,
                    unread_count,
                    notes_count: row.get(7)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);
        drop(db);

        for view in &mut views {
            view.participants = self.get_participants(&view.channel_id)?;
        }

        if unread_only {
            views.retain(|v| v.unread_count.unwrap_or(0) > 0);
        }

        Ok(views)
    }

    pub fn get_export_data(&self, channel_id: &str) -> Result<ChannelExport> {
        let db = self.db.lock().unwrap();
        let (name, topic, created_at, archived_at): (String, Option<String>, String, Option<String>) = db
            .query_row(
                "SELECT name, topic, created_at, archived_at FROM channels WHERE id = ?1",
                [channel_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?
            .ok_or_else(|| BridgeError::ChannelNotFound(channel_id.to_string()))?;
        drop(db);

        Ok(ChannelExport {
            channel_id: channel_id.to_string(),
            name,
            topic,
            created_at,
            archived_at,
            messages: self.get_all_messages(channel_id)?,
            notes: self.get_notes(channel_id)?,
        })
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let priority_str: String = row.get(4)?;
    Ok(Message {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        agent_id: row.get(2)?,
        content: row.get(3)?,
        priority: priority_str.parse().unwrap_or_default(),
        created_at: row.get(5)?,
    })
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        note_id: row.get(0)?,
        channel_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_bookmarks_s3() {
        let store = BridgeStore::open_in_memory().unwrap();
        let ch = store.resolve_channel_id("shared").unwrap();
        store.create_message(&ch, "system", "m1", MessagePriority::Normal).unwrap();
        store.create_message(&ch, "system", "m2", MessagePriority::Normal).unwrap();
        store.create_message(&ch, "system", "m3", MessagePriority::Normal).unwrap();

        let r1 = store.recv_updates(&ch, "a1").unwrap();
        assert_eq!(r1.count, 3);

        store.create_message(&ch, "system", "m4", MessagePriority::Normal).unwrap();

        let r1b = store.recv_updates(&ch, "a1").unwrap();
        assert_eq!(r1b.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(), vec!["m4"]);

        let r2 = store.recv_updates(&ch, "a2").unwrap();
        assert_eq!(
            r2.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2", "m3", "m4"]
        );
    }

    #[test]
    fn second_recv_with_no_send_returns_empty() {
        let store = BridgeStore::open_in_memory().unwrap();
        let ch = store.resolve_channel_id("c").unwrap();
        store.create_message(&ch, "system", "m1", MessagePriority::Normal).unwrap();
        store.recv_updates(&ch, "a").unwrap();
        let second = store.recv_updates(&ch, "a").unwrap();
        assert_eq!(second.count, 0);
    }

    #[test]
    fn alert_fanout_s2() {
        let store = BridgeStore::open_in_memory().unwrap();
        let ch = store.resolve_channel_id("critical-path").unwrap();
        store.create_message(&ch, "zealot-1", "Migration needed", MessagePriority::Alert).unwrap();

        let alerts = store.get_alerts("zealot-2").unwrap();
        assert_eq!(alerts.len(), 1);

        store.recv_updates(&ch, "zealot-2").unwrap();
        let alerts_after = store.get_alerts("zealot-2").unwrap();
        assert!(alerts_after.is_empty());
    }

    #[test]
    fn get_alerts_excludes_archived_channels() {
        let store = BridgeStore::open_in_memory().unwrap();
        let ch = store.resolve_channel_id("will-archive").unwrap();
        store.create_message(&ch, "a1", "alert!", MessagePriority::Alert).unwrap();
        store.archive_channel(&ch).unwrap();
        assert!(store.get_alerts("a2").unwrap().is_empty());
    }

    #[test]
    fn summary_channel_returns_only_last_message() {
        let store = BridgeStore::open_in_memory().unwrap();
        let ch = store.resolve_channel_id(SUMMARY_CHANNEL).unwrap();
        store.create_message(&ch, "system", "old", MessagePriority::Normal).unwrap();
        store.create_message(&ch, "system", "new", MessagePriority::Normal).unwrap();
        store.set_bookmark("a", &ch, "ffffffff-ffff-7fff-afff-ffffffffffff").unwrap();

        let messages = store.get_new_messages(&ch, "a").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "new");
    }

    #[test]
    fn rename_channel_outcomes() {
        let store = BridgeStore::open_in_memory().unwrap();
        store.resolve_channel_id("alpha").unwrap();
        let beta = store.resolve_channel_id("beta").unwrap();
        store.archive_channel(&beta).unwrap();

        assert_eq!(store.rename_channel("alpha", "beta").unwrap(), RenameOutcome::ConflictArchived);
        assert_eq!(store.rename_channel("nope", "gamma").unwrap(), RenameOutcome::NotFound);

        store.resolve_channel_id("gamma").unwrap();
        assert_eq!(store.rename_channel("alpha", "gamma").unwrap(), RenameOutcome::Conflict);
        assert_eq!(store.rename_channel("alpha", "delta").unwrap(), RenameOutcome::Renamed);
    }

    #[test]
    fn set_topic_only_sets_when_unset() {
        let store = BridgeStore::open_in_memory().unwrap();
        let ch = store.resolve_channel_id("c").unwrap();
        store.set_topic(&ch, "first").unwrap();
        store.set_topic(&ch, "second").unwrap();
        assert_eq!(store.get_channel_topic(&ch).unwrap(), Some("first".to_string()));
    }
}
