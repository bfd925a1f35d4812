use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use space_core::types::ShortIdResolution;
use space_events::EventStore;
use tracing::instrument;

use crate::db::MIGRATIONS;
use crate::error::{KnowledgeError, Result};
use crate::types::Knowledge;

const KNOWLEDGE_COLUMNS: &str =
    "knowledge_id, domain, agent_id, content, confidence, created_at, archived_at";

/// Words not counted towards `find_related`'s keyword overlap. See
/// `space_memory`'s stopword list for the same caveat: `text_utils.py`'s
/// original list wasn't in the retrieval pack.
const STOPWORDS: &[&str] = &[
    "that", "this", "with", "from", "have", "your", "will", "what", "when",
    "where", "which", "about", "there", "their", "would", "could", "should",
    "into", "than", "them", "then", "these", "those", "been", "being",
    "does", "just", "only", "also", "more", "some", "such", "each", "other",
    "over", "after", "before", "because", "while", "still", "very", "much",
    "many", "were", "was", "has", "had", "not", "but", "can", "all", "any",
    "its", "out", "who", "how", "why", "are", "for", "you",
];

/// Shared, domain-scoped corpus of learned patterns attributed by
/// contributor agent (spec §4.8), grounded in `knowledge/db.py`.
pub struct KnowledgeStore {
    db: Mutex<Connection>,
    events: Arc<EventStore>,
}

impl KnowledgeStore {
    pub fn open(path: &Path, events: Arc<EventStore>) -> Result<Self> {
        let mut conn = space_store::open(path)?;
        space_store::apply_migrations(&mut conn, MIGRATIONS)?;
        Ok(Self { db: Mutex::new(conn), events })
    }

    /// An in-process store backed by SQLite's `:memory:` database, for
    /// tests and other in-process callers that don't need durability.
    pub fn open_in_memory(events: Arc<EventStore>) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        space_store::apply_migrations(&mut conn, MIGRATIONS)?;
        Ok(Self { db: Mutex::new(conn), events })
    }

    fn resolve_knowledge_id(&self, short_or_full: &str) -> Result<String> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT knowledge_id FROM knowledge WHERE knowledge_id LIKE ?1")?;
        let pattern = format!("%{short_or_full}");
        let matches: Vec<String> =
            stmt.query_map([pattern], |r| r.get(0))?.filter_map(|r| r.ok()).collect();
        drop(stmt);
        drop(db);
        match space_ids::resolve_short_id(matches) {
            ShortIdResolution::Resolved(id) => Ok(id),
            ShortIdResolution::NotFound => Err(KnowledgeError::NotFound(short_or_full.to_string())),
            ShortIdResolution::Ambiguous(candidates) => {
                Err(KnowledgeError::Ambiguous { short: short_or_full.to_string(), candidates })
            }
        }
    }

    #[instrument(skip(self, content))]
    pub fn write_knowledge(
        &self,
        domain: &str,
        agent_id: &str,
        content: &str,
        confidence: Option<f64>,
    ) -> Result<String> {
        let knowledge_id = space_ids::uuid7();
        {
            let db = self.db.lock().unwrap();
            db.execute(
                "INSERT INTO knowledge (knowledge_id, domain, agent_id, content, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
                params![knowledge_id, domain, agent_id, content, confidence],
            )?;
        }
        let preview: String = content.chars().take(50).collect();
        self.events.emit(
            "knowledge",
            "entry.write",
            Some(agent_id),
            Some(json!({ "domain": domain, "preview": preview })),
        )?;
        Ok(knowledge_id)
    }

    pub fn query_by_domain(&self, domain: &str, include_archived: bool) -> Result<Vec<Knowledge>> {
        let db = self.db.lock().unwrap();
        let mut sql = format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge WHERE domain = ?1");
        if !include_archived {
            sql.push_str(" AND archived_at IS NULL");
        }
        sql.push_str(" ORDER BY created_at DESC");
        let mut stmt = db.prepare(&sql)?;
        let result: Vec<Knowledge> = stmt.query_map([domain], row_to_knowledge)?.filter_map(|r| r.ok()).collect();
        Ok(result)
    }

    pub fn query_by_agent(&self, agent_id: &str, include_archived: bool) -> Result<Vec<Knowledge>> {
        let db = self.db.lock().unwrap();
        let mut sql = format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge WHERE agent_id = ?1");
        if !include_archived {
            sql.push_str(" AND archived_at IS NULL");
        }
        sql.push_str(" ORDER BY created_at DESC");
        let mut stmt = db.prepare(&sql)?;
        let result: Vec<Knowledge> = stmt.query_map([agent_id], row_to_knowledge)?.filter_map(|r| r.ok()).collect();
        Ok(result)
    }

    pub fn list_all(&self, include_archived: bool) -> Result<Vec<Knowledge>> {
        let db = self.db.lock().unwrap();
        let mut sql = format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge");
        if !include_archived {
            sql.push_str(" WHERE archived_at IS NULL");
        }
        sql.push_str(" ORDER BY created_at DESC");
        let mut stmt = db.prepare(&sql)?;
        let result: Vec<Knowledge> = stmt.query_map([], row_to_knowledge)?.filter_map(|r| r.ok()).collect();
        Ok(result)
    }

    pub fn get_by_id(&self, short_or_full: &str) -> Result<Option<Knowledge>> {
        let full_id = self.resolve_knowledge_id(short_or_full)?;
        let db = self.db.lock().unwrap();
        Ok(db
            .query_row(
                &format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge WHERE knowledge_id = ?1"),
                [&full_id],
                row_to_knowledge,
            )
            .optional()?)
    }

    #[instrument(skip(self, new_content))]
    pub fn update_entry(&self, short_or_full: &str, new_content: &str, new_confidence: Option<f64>) -> Result<()> {
        let full_id = self.resolve_knowledge_id(short_or_full)?;
        let entry = self
            .get_by_id(&full_id)?
            .ok_or_else(|| KnowledgeError::NotFound(short_or_full.to_string()))?;
        {
            let db = self.db.lock().unwrap();
            db.execute(
                "UPDATE knowledge SET content = ?1, confidence = COALESCE(?2, confidence) WHERE knowledge_id = ?3",
                params![new_content, new_confidence, full_id],
            )?;
        }
        self.events.emit(
            "knowledge",
            "entry.update",
            Some(&entry.agent_id),
            Some(json!({ "knowledge_id": space_ids::short_id(&full_id) })),
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn archive_entry(&self, short_or_full: &str) -> Result<()> {
        let full_id = self.resolve_knowledge_id(short_or_full)?;
        let entry = self
            .get_by_id(&full_id)?
            .ok_or_else(|| KnowledgeError::NotFound(short_or_full.to_string()))?;
        {
            let db = self.db.lock().unwrap();
            db.execute(
                "UPDATE knowledge SET archived_at = datetime('now') WHERE knowledge_id = ?1",
                [&full_id],
            )?;
        }
        self.events.emit(
            "knowledge",
            "entry.archive",
            Some(&entry.agent_id),
            Some(json!({ "knowledge_id": space_ids::short_id(&full_id) })),
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn restore_entry(&self, short_or_full: &str) -> Result<()> {
        let full_id = self.resolve_knowledge_id(short_or_full)?;
        let entry = self
            .get_by_id(&full_id)?
            .ok_or_else(|| KnowledgeError::NotFound(short_or_full.to_string()))?;
        {
            let db = self.db.lock().unwrap();
            db.execute("UPDATE knowledge SET archived_at = NULL WHERE knowledge_id = ?1", [&full_id])?;
        }
        self.events.emit(
            "knowledge",
            "entry.restore",
            Some(&entry.agent_id),
            Some(json!({ "knowledge_id": space_ids::short_id(&full_id) })),
        )?;
        Ok(())
    }

    /// Every distinct `agent_id` with at least one entry — feeds the
    /// discovery-set union for stats (spec §4.10).
    pub fn distinct_agent_ids(&self) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT DISTINCT agent_id FROM knowledge")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Per-agent entry counts, for stats aggregation.
    pub fn count_by_agent(&self) -> Result<std::collections::HashMap<String, i64>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT agent_id, COUNT(*) FROM knowledge GROUP BY agent_id")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Cross-agent substring search over domain/content
    /// (`context.py`'s knowledge leg).
    pub fn search_all(&self, query_substr: &str, agent_id: Option<&str>) -> Result<Vec<Knowledge>> {
        let db = self.db.lock().unwrap();
        let pattern = format!("%{query_substr}%");
        let mut sql = format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge WHERE (content LIKE ?1 OR domain LIKE ?1)");
        if agent_id.is_some() {
            sql.push_str(" AND agent_id = ?2");
        }
        sql.push_str(" ORDER BY created_at ASC");
        let mut stmt = db.prepare(&sql)?;
        let rows = if let Some(agent_id) = agent_id {
            stmt.query_map(params![pattern, agent_id], row_to_knowledge)?.filter_map(|r| r.ok()).collect()
        } else {
            stmt.query_map([&pattern], row_to_knowledge)?.filter_map(|r| r.ok()).collect()
        };
        Ok(rows)
    }

    /// Keyword-overlap similarity over `domain + content` tokens, same
    /// scorer shape as `space_memory::MemoryStore::find_related`.
    pub fn find_related(&self, entry: &Knowledge, limit: i64, include_archived: bool) -> Result<Vec<(Knowledge, i64)>> {
        let keywords = extract_keywords(&entry.domain, &entry.content);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.db.lock().unwrap();
        let mut sql = format!("SELECT {KNOWLEDGE_COLUMNS} FROM knowledge WHERE knowledge_id != ?1");
        if !include_archived {
            sql.push_str(" AND archived_at IS NULL");
        }
        let mut stmt = db.prepare(&sql)?;
        let candidates: Vec<Knowledge> =
            stmt.query_map([&entry.knowledge_id], row_to_knowledge)?.filter_map(|r| r.ok()).collect();
        drop(stmt);
        drop(db);

        let mut scored: Vec<(Knowledge, i64)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let candidate_keywords = extract_keywords(&candidate.domain, &candidate.content);
                let score = keywords.intersection(&candidate_keywords).count() as i64;
                (score > 0).then_some((candidate, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.created_at.cmp(&a.0.created_at)));
        scored.truncate(limit.max(0) as usize);
        Ok(scored)
    }
}

fn extract_keywords(domain: &str, content: &str) -> HashSet<String> {
    format!("{domain} {content}")
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()).to_string())
        .filter(|t| t.len() > 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn row_to_knowledge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Knowledge> {
    Ok(Knowledge {
        knowledge_id: row.get(0)?,
        domain: row.get(1)?,
        agent_id: row.get(2)?,
        content: row.get(3)?,
        confidence: row.get(4)?,
        created_at: row.get(5)?,
        archived_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KnowledgeStore {
        let events = Arc::new(EventStore::open_in_memory().unwrap());
        KnowledgeStore::open_in_memory(events).unwrap()
    }

    #[test]
    fn write_and_query_by_domain() {
        let store = store();
        store.write_knowledge("deploys", "a1", "canary before full rollout", Some(0.9)).unwrap();
        store.write_knowledge("deploys", "a2", "always run smoke tests first", None).unwrap();
        store.write_knowledge("incidents", "a1", "check disk before paging", None).unwrap();

        assert_eq!(store.query_by_domain("deploys", false).unwrap().len(), 2);
        assert_eq!(store.query_by_agent("a1", false).unwrap().len(), 2);
    }

    #[test]
    fn archive_excludes_from_default_queries() {
        let store = store();
        let id = store.write_knowledge("deploys", "a1", "canary first", None).unwrap();
        store.archive_entry(&id).unwrap();
        assert!(store.query_by_domain("deploys", false).unwrap().is_empty());
        assert_eq!(store.query_by_domain("deploys", true).unwrap().len(), 1);

        store.restore_entry(&id).unwrap();
        assert_eq!(store.query_by_domain("deploys", false).unwrap().len(), 1);
    }

    #[test]
    fn update_entry_changes_content_in_place() {
        let store = store();
        let id = store.write_knowledge("deploys", "a1", "old advice", None).unwrap();
        store.update_entry(&id, "revised advice", Some(0.5)).unwrap();
        let entry = store.get_by_id(&id).unwrap().unwrap();
        assert_eq!(entry.content, "revised advice");
        assert_eq!(entry.confidence, Some(0.5));
    }

    #[test]
    fn find_related_requires_overlap() {
        let store = store();
        let seed = store.write_knowledge("deploys", "a1", "canary deployment rollback plan", None).unwrap();
        store.write_knowledge("deploys", "a2", "canary deployment smoke testing", None).unwrap();
        store.write_knowledge("snacks", "a2", "coffee machine replacement order", None).unwrap();

        let entry = store.get_by_id(&seed).unwrap().unwrap();
        let related = store.find_related(&entry, 5, false).unwrap();
        assert_eq!(related.len(), 1);
        assert!(related[0].0.content.contains("smoke testing"));
    }
}
