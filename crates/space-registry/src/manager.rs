use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use space_core::types::ShortIdResolution;
use tracing::instrument;

use crate::db::MIGRATIONS;
use crate::error::{RegistryError, Result};
use crate::types::Agent;

/// The agent/constitution registry (spec §4.2), grounded in
/// `spawn/registry.py`.
pub struct RegistryStore {
    db: Mutex<Connection>,
}

impl RegistryStore {
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

    /// Content-address a constitution document; identical content is only
    /// ever stored once (`INSERT OR IGNORE`).
    pub fn save_constitution(&self, content: &str) -> Result<String> {
        let hash = space_ids::hash_content(content);
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO constitutions (hash, content) VALUES (?1, ?2)",
            params![hash, content],
        )?;
        Ok(hash)
    }

    pub fn get_constitution(&self, hash: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let content = db
            .query_row("SELECT content FROM constitutions WHERE hash = ?1", [hash], |r| r.get(0))
            .optional()?;
        Ok(content)
    }

    /// Resolve `name` to its canonical agent id if already registered,
    /// otherwise register a brand-new agent with `name` as both its
    /// primary name and its own first alias (spec §2 — supplemented
    /// bootstrap behaviour; `ensure_agent`).
    #[instrument(skip(self))]
    pub fn ensure_agent(&self, name: &str) -> Result<String> {
        if let Some(id) = self.get_agent_id(name)? {
            return Ok(id);
        }

        let id = space_ids::uuid7();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO agents (id, name, self_description, canonical_id, created_at)
             VALUES (?1, ?2, NULL, NULL, datetime('now'))",
            params![id, name],
        )?;
        db.execute(
            "INSERT INTO agent_aliases (agent_id, alias) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(id)
    }

    /// Look up an agent id by name: check `agents.name` first (returning
    /// its `canonical_id` if one was merged in), then fall back to
    /// `agent_aliases`, again following `canonical_id`.
    pub fn get_agent_id(&self, name: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();

        let direct: Option<(String, Option<String>)> = db
            .query_row(
                "SELECT id, canonical_id FROM agents WHERE name = ?1",
                [name],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        if let Some((id, canonical_id)) = direct {
            return Ok(Some(canonical_id.unwrap_or(id)));
        }

        let via_alias: Option<(String, Option<String>)> = db
            .query_row(
                "SELECT a.id, a.canonical_id
                 FROM agent_aliases al
                 JOIN agents a ON a.id = al.agent_id
                 WHERE al.alias = ?1",
                [name],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        Ok(via_alias.map(|(id, canonical_id)| canonical_id.unwrap_or(id)))
    }

    pub fn get_agent_name(&self, agent_id: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let name = db
            .query_row("SELECT name FROM agents WHERE id = ?1", [agent_id], |r| r.get(0))
            .optional()?;
        Ok(name)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        let db = self.db.lock().unwrap();
        let agent = db
            .query_row(
                "SELECT id, name, self_description, canonical_id, created_at
                 FROM agents WHERE id = ?1",
                [agent_id],
                row_to_agent,
            )
            .optional()?;
        Ok(agent)
    }

    /// Ids of registered agents not merged away into a canonical other
    /// (`canonical_id IS NULL`) — the registry's side of the stats
    /// discovery-set union (spec §4.10). The registry has no separate
    /// archival concept for agents, so a merged-away agent is the
    /// closest equivalent to "archived" here.
    pub fn list_active_agent_ids(&self) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT id FROM agents WHERE canonical_id IS NULL")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Rename an agent's primary name. Fails with `AlreadyExists` if another
    /// agent already owns `new_name` (`registry.py::rename_agent` raises
    /// `ValueError` for the same case).
    pub fn rename_agent(&self, agent_id: &str, new_name: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let taken: Option<String> = db
            .query_row(
                "SELECT id FROM agents WHERE name = ?1 AND id != ?2",
                params![new_name, agent_id],
                |r| r.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(RegistryError::AlreadyExists(new_name.to_string()));
        }

        let rows = db.execute(
            "UPDATE agents SET name = ?2 WHERE id = ?1",
            params![agent_id, new_name],
        )?;
        if rows == 0 {
            return Err(RegistryError::NotFound(agent_id.to_string()));
        }
        db.execute(
            "INSERT OR IGNORE INTO agent_aliases (agent_id, alias) VALUES (?1, ?2)",
            params![agent_id, new_name],
        )?;
        Ok(())
    }

    /// Register `alias` as an additional name resolving to `agent_id`.
    pub fn add_alias(&self, agent_id: &str, alias: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO agent_aliases (agent_id, alias) VALUES (?1, ?2)",
            params![agent_id, alias],
        )?;
        Ok(())
    }

    /// Merge `agent_id` into `canonical_id`: future `get_agent_id` lookups
    /// for `agent_id`'s name/aliases resolve to `canonical_id` instead.
    pub fn set_canonical(&self, agent_id: &str, canonical_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE agents SET canonical_id = ?2 WHERE id = ?1",
            params![agent_id, canonical_id],
        )?;
        if rows == 0 {
            return Err(RegistryError::NotFound(agent_id.to_string()));
        }
        Ok(())
    }

    /// Upsert an agent's self-description, creating the agent row inline
    /// (named after `agent_id`) if it doesn't exist yet
    /// (`registry.py::set_self_description`).
    pub fn set_self_description(&self, agent_id: &str, description: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE agents SET self_description = ?2 WHERE id = ?1",
            params![agent_id, description],
        )?;
        if rows == 0 {
            db.execute(
                "INSERT INTO agents (id, name, self_description, canonical_id, created_at)
                 VALUES (?1, ?1, ?2, NULL, datetime('now'))",
                params![agent_id, description],
            )?;
            db.execute(
                "INSERT OR IGNORE INTO agent_aliases (agent_id, alias) VALUES (?1, ?1)",
                [agent_id],
            )?;
        }
        Ok(())
    }

    pub fn get_self_description(&self, agent_id: &str) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let desc = db
            .query_row(
                "SELECT self_description FROM agents WHERE id = ?1",
                [agent_id],
                |r| r.get(0),
            )
            .optional()?
            .flatten();
        Ok(desc)
    }

    /// Resolve a short (suffix) id against full agent ids.
    pub fn resolve_short_id(&self, suffix: &str) -> Result<ShortIdResolution> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT id FROM agents WHERE id LIKE ?1")?;
        let pattern = format!("%{suffix}");
        let matches: Vec<String> = stmt
            .query_map([pattern], |r| r.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(space_ids::resolve_short_id(matches))
    }
}

fn row_to_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        self_description: row.get(2)?,
        canonical_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_agent_is_idempotent_and_bootstraps_alias() {
        let store = RegistryStore::open_in_memory().unwrap();
        let id1 = store.ensure_agent("researcher-1").unwrap();
        let id2 = store.ensure_agent("researcher-1").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.get_agent_id("researcher-1").unwrap(), Some(id1));
    }

    #[test]
    fn rename_agent_rejects_conflict() {
        let store = RegistryStore::open_in_memory().unwrap();
        store.ensure_agent("alice").unwrap();
        let bob = store.ensure_agent("bob").unwrap();
        let err = store.rename_agent(&bob, "alice").unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));
    }

    #[test]
    fn set_canonical_merges_lookup() {
        let store = RegistryStore::open_in_memory().unwrap();
        let old = store.ensure_agent("old-name").unwrap();
        let new = store.ensure_agent("new-name").unwrap();
        store.set_canonical(&old, &new).unwrap();
        assert_eq!(store.get_agent_id("old-name").unwrap(), Some(new.clone()));
        assert_eq!(store.get_agent_id("new-name").unwrap(), Some(new));
    }

    #[test]
    fn set_self_description_creates_missing_agent() {
        let store = RegistryStore::open_in_memory().unwrap();
        let id = space_ids::uuid7();
        store.set_self_description(&id, "a helpful scout").unwrap();
        assert_eq!(store.get_self_description(&id).unwrap(), Some("a helpful scout".to_string()));
        assert_eq!(store.get_agent_id(&id).unwrap(), Some(id));
    }

    #[test]
    fn save_constitution_is_content_addressed() {
        let store = RegistryStore::open_in_memory().unwrap();
        let h1 = store.save_constitution("hello").unwrap();
        let h2 = store.save_constitution("hello").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.get_constitution(&h1).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn resolve_short_id_branches() {
        let store = RegistryStore::open_in_memory().unwrap();
        let id = store.ensure_agent("solo").unwrap();
        let suffix = &id[id.len() - 6..];
        assert_eq!(store.resolve_short_id(suffix).unwrap(), ShortIdResolution::Resolved(id));
        assert_eq!(store.resolve_short_id("nonexistent-suffix").unwrap(), ShortIdResolution::NotFound);
    }
}
