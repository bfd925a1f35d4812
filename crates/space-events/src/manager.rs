use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::db::MIGRATIONS;
use crate::error::Result;
use crate::types::{Event, EventQuery};

/// The append-only event journal (spec §4.7), grounded in `events.py`'s
/// `emit`/`query`.
pub struct EventStore {
    db: Mutex<Connection>,
}

impl EventStore {
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

    /// Append a new journal entry. `agent_id` is `None` for events that
    /// aren't attributable to any single agent.
    #[instrument(skip(self, data), fields(source, event_type))]
    pub fn emit(
        &self,
        source: &str,
        event_type: &str,
        agent_id: Option<&str>,
        data: Option<serde_json::Value>,
    ) -> Result<Event> {
        let id = space_ids::uuid7();
        let data_str = data.as_ref().map(|v| v.to_string());
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO events (id, source, event_type, agent_id, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            params![id, source, event_type, agent_id, data_str],
        )?;
        let created_at: String =
            db.query_row("SELECT created_at FROM events WHERE id = ?1", [&id], |r| r.get(0))?;
        Ok(Event {
            id,
            source: source.to_string(),
            event_type: event_type.to_string(),
            agent_id: agent_id.map(|s| s.to_string()),
            data,
            created_at,
        })
    }

    /// Filtered, most-recent-first journal read (spec §4.7).
    #[instrument(skip(self))]
    pub fn query(&self, filter: &EventQuery) -> Result<Vec<Event>> {
        let db = self.db.lock().unwrap();
        let mut sql = String::from(
            "SELECT id, source, event_type, agent_id, data, created_at FROM events WHERE 1=1",
        );
        if filter.source.is_some() {
            sql.push_str(" AND source = :source");
        }
        if filter.agent_id.is_some() {
            sql.push_str(" AND agent_id = :agent_id");
        }
        if filter.event_type.is_some() {
            sql.push_str(" AND event_type = :event_type");
        }
        sql.push_str(" ORDER BY id DESC LIMIT :limit");

        let mut stmt = db.prepare(&sql)?;
        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> = Vec::new();
        if let Some(source) = &filter.source {
            named.push((":source", source));
        }
        if let Some(agent_id) = &filter.agent_id {
            named.push((":agent_id", agent_id));
        }
        if let Some(event_type) = &filter.event_type {
            named.push((":event_type", event_type));
        }
        let limit = filter.limit as i64;
        named.push((":limit", &limit));

        let rows = stmt.query_map(named.as_slice(), row_to_event)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Single event lookup by id, used when an event id was surfaced
    /// elsewhere (e.g. a constitution-invocation record).
    pub fn get(&self, id: &str) -> Result<Option<Event>> {
        let db = self.db.lock().unwrap();
        let event = db
            .query_row(
                "SELECT id, source, event_type, agent_id, data, created_at
                 FROM events WHERE id = ?1",
                [id],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Every distinct agent id ever attributed to an event, used by the
    /// stats discovery-set union (spec §4.10; `commands/analytics.py`).
    pub fn distinct_agent_ids(&self) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT DISTINCT agent_id FROM events WHERE agent_id IS NOT NULL ORDER BY agent_id",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Events whose `data` payload contains `query_substr`, optionally
    /// scoped to one `agent_id` — feeds the topic-context timeline
    /// (`context.py::_collect_timeline`'s events leg).
    pub fn search(&self, query_substr: &str, agent_id: Option<&str>) -> Result<Vec<Event>> {
        let db = self.db.lock().unwrap();
        let pattern = format!("%{query_substr}%");
        let mut sql = String::from(
            "SELECT id, source, event_type, agent_id, data, created_at FROM events WHERE data LIKE ?1",
        );
        if agent_id.is_some() {
            sql.push_str(" AND agent_id = ?2");
        }
        sql.push_str(" ORDER BY id ASC");
        let mut stmt = db.prepare(&sql)?;
        let rows = if let Some(agent_id) = agent_id {
            stmt.query_map(params![pattern, agent_id], row_to_event)?.filter_map(|r| r.ok()).collect()
        } else {
            stmt.query_map([&pattern], row_to_event)?.filter_map(|r| r.ok()).collect()
        };
        Ok(rows)
    }

    /// Count of events per `event_type` for a given `agent_id`, e.g. to
    /// derive a "spawns" count from `session_start` events.
    pub fn count_by_type(&self, agent_id: &str, event_type: &str) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM events WHERE agent_id = ?1 AND event_type = ?2",
            params![agent_id, event_type],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let data_str: Option<String> = row.get(4)?;
    let data = data_str.and_then(|s| serde_json::from_str(&s).ok());
    Ok(Event {
        id: row.get(0)?,
        source: row.get(1)?,
        event_type: row.get(2)?,
        agent_id: row.get(3)?,
        data,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_and_query_roundtrip() {
        let store = EventStore::open_in_memory().unwrap();
        store
            .emit("memory", "memory/add", Some("agent-1"), Some(serde_json::json!({"topic": "t"})))
            .unwrap();
        store.emit("bridge", "bridge/message", None, None).unwrap();

        let all = store.query(&EventQuery::new()).unwrap();
        assert_eq!(all.len(), 2);

        let by_agent = store.query(&EventQuery::new().agent_id("agent-1")).unwrap();
        assert_eq!(by_agent.len(), 1);
        assert_eq!(by_agent[0].event_type, "memory/add");
    }

    #[test]
    fn distinct_agent_ids_ignores_null() {
        let store = EventStore::open_in_memory().unwrap();
        store.emit("a", "x", Some("agent-1"), None).unwrap();
        store.emit("a", "x", Some("agent-2"), None).unwrap();
        store.emit("a", "x", None, None).unwrap();
        let mut ids = store.distinct_agent_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["agent-1".to_string(), "agent-2".to_string()]);
    }
}
