use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::db::MIGRATIONS;
use crate::error::Result;
use crate::types::{Task, TaskStatus, TaskTree};

const TASK_COLUMNS: &str = "task_id, parent_id, description, status, assigned_to, handover, channel_id, created_at";

/// The optional task tree (spec §4, grounded in `ops/api/__init__.py`):
/// create/claim/complete/block, hierarchical listing, and handover
/// reduction of completed subtasks into their parent.
pub struct OpsStore {
    db: Mutex<Connection>,
}

impl OpsStore {
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

    #[instrument(skip(self, description))]
    pub fn create(
        &self,
        description: &str,
        parent_id: Option<&str>,
        channel_id: Option<&str>,
        assigned_to: Option<&str>,
    ) -> Result<String> {
        let task_id = space_ids::uuid7();
        let status = if assigned_to.is_some() { TaskStatus::Claimed } else { TaskStatus::Open };
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks (task_id, parent_id, description, status, assigned_to, handover, channel_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, datetime('now'))",
            params![task_id, parent_id, description, status.to_string(), assigned_to, channel_id],
        )?;
        Ok(task_id)
    }

    pub fn get(&self, task_id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .query_row(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"), [task_id], row_to_task)
            .optional()?)
    }

    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        assigned_to: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1");
        let mut binds: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(status) = status {
            binds.push(Box::new(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", binds.len()));
        }
        if let Some(assigned_to) = assigned_to {
            binds.push(Box::new(assigned_to.to_string()));
            sql.push_str(&format!(" AND assigned_to = ?{}", binds.len()));
        }
        if let Some(parent_id) = parent_id {
            binds.push(Box::new(parent_id.to_string()));
            sql.push_str(&format!(" AND parent_id = ?{}", binds.len()));
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut stmt = db.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = binds.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_task)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Claim an open task for `agent_id`. Fails silently (`false`) if the
    /// task doesn't exist or is already claimed/complete/blocked.
    #[instrument(skip(self))]
    pub fn claim(&self, task_id: &str, agent_id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE tasks SET status = 'claimed', assigned_to = ?2 WHERE task_id = ?1 AND status = 'open'",
            params![task_id, agent_id],
        )?;
        Ok(changed > 0)
    }

    /// Mark a task complete with its handover note, attributing it to
    /// `agent_id`.
    #[instrument(skip(self, handover))]
    pub fn complete(&self, task_id: &str, handover: &str, agent_id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE tasks SET status = 'complete', handover = ?2, assigned_to = ?3 WHERE task_id = ?1",
            params![task_id, handover, agent_id],
        )?;
        Ok(changed > 0)
    }

    /// Block a task, storing `reason` in its handover field (`ops/api::block`
    /// reuses handover for the blocking reason, not a separate column).
    pub fn block(&self, task_id: &str, reason: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE tasks SET status = 'blocked', handover = ?2 WHERE task_id = ?1",
            params![task_id, reason],
        )?;
        Ok(changed > 0)
    }

    fn subtasks(&self, parent_id: &str) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE parent_id = ?1 ORDER BY created_at ASC"))?;
        let rows = stmt.query_map([parent_id], row_to_task)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn tree(&self, task_id: &str) -> Result<Option<TaskTree>> {
        let Some(task) = self.get(task_id)? else {
            return Ok(None);
        };
        let mut subtasks = Vec::new();
        for child in self.subtasks(task_id)? {
            if let Some(child_tree) = self.tree(&child.task_id)? {
                subtasks.push(child_tree);
            }
        }
        Ok(Some(TaskTree { task, subtasks }))
    }

    /// Aggregate every direct subtask's handover into the parent's and
    /// mark it complete, per `ops/api::reduce`. Requires every subtask
    /// (at least one must exist) to already be complete; claims the
    /// parent for `agent_id` first if it is still unassigned.
    #[instrument(skip(self, handover))]
    pub fn reduce(&self, parent_id: &str, handover: &str, agent_id: &str) -> Result<bool> {
        let Some(parent) = self.get(parent_id)? else {
            return Ok(false);
        };
        let subtasks = self.subtasks(parent_id)?;
        if subtasks.is_empty() {
            return Ok(false);
        }
        if subtasks.iter().any(|t| t.status != TaskStatus::Complete) {
            return Ok(false);
        }

        if parent.assigned_to.is_none() {
            self.claim(parent_id, agent_id)?;
        }

        let aggregated = subtasks
            .iter()
            .map(|t| format!("**{}**\n{}", t.description, t.handover.as_deref().unwrap_or("(no handover)")))
            .collect::<Vec<_>>()
            .join("\n\n");
        let final_handover = format!("{handover}\n\n## Subtask Results\n\n{aggregated}");

        self.complete(parent_id, &final_handover, agent_id)
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let status_str: String = row.get(3)?;
    Ok(Task {
        task_id: row.get(0)?,
        parent_id: row.get(1)?,
        description: row.get(2)?,
        status: status_str.parse().unwrap_or(TaskStatus::Open),
        assigned_to: row.get(4)?,
        handover: row.get(5)?,
        channel_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get_roundtrip() {
        let store = OpsStore::open_in_memory().unwrap();
        let task_id = store.create("Build feature", None, None, None).unwrap();
        let task = store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.description, "Build feature");
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn claim_then_complete_workflow() {
        let store = OpsStore::open_in_memory().unwrap();
        let task_id = store.create("Build feature", None, None, None).unwrap();

        assert!(store.claim(&task_id, "agent-1").unwrap());
        assert!(!store.claim(&task_id, "agent-2").unwrap());

        assert!(store.complete(&task_id, "Feature built. PR #123", "agent-1").unwrap());
        let task = store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.handover.as_deref(), Some("Feature built. PR #123"));
    }

    #[test]
    fn reduce_aggregates_completed_subtasks() {
        let store = OpsStore::open_in_memory().unwrap();
        let parent_id = store.create("Build payment system", None, None, None).unwrap();
        let sub1 = store.create("Stripe SDK", Some(&parent_id), None, None).unwrap();
        let sub2 = store.create("Webhooks", Some(&parent_id), None, None).unwrap();

        store.claim(&sub1, "agent-1").unwrap();
        store.complete(&sub1, "SDK integrated", "agent-1").unwrap();
        store.claim(&sub2, "agent-2").unwrap();
        store.complete(&sub2, "Webhooks working", "agent-2").unwrap();

        assert!(store.reduce(&parent_id, "Payment system complete", "integrator").unwrap());

        let parent = store.get(&parent_id).unwrap().unwrap();
        assert_eq!(parent.status, TaskStatus::Complete);
        let handover = parent.handover.unwrap();
        assert!(handover.contains("Payment system complete"));
        assert!(handover.contains("SDK integrated"));
        assert!(handover.contains("Webhooks working"));
    }

    #[test]
    fn reduce_fails_with_incomplete_subtasks() {
        let store = OpsStore::open_in_memory().unwrap();
        let parent_id = store.create("Parent", None, None, None).unwrap();
        let sub1 = store.create("Sub 1", Some(&parent_id), None, None).unwrap();
        let _sub2 = store.create("Sub 2", Some(&parent_id), None, None).unwrap();

        store.claim(&sub1, "agent").unwrap();
        store.complete(&sub1, "Done", "agent").unwrap();

        assert!(!store.reduce(&parent_id, "Integration", "agent").unwrap());
        let parent = store.get(&parent_id).unwrap().unwrap();
        assert_eq!(parent.status, TaskStatus::Open);
    }

    #[test]
    fn tree_shows_hierarchy() {
        let store = OpsStore::open_in_memory().unwrap();
        let parent_id = store.create("Parent", None, None, None).unwrap();
        let child1 = store.create("Child 1", Some(&parent_id), None, None).unwrap();
        let child2 = store.create("Child 2", Some(&parent_id), None, None).unwrap();

        let tree = store.tree(&parent_id).unwrap().unwrap();
        assert_eq!(tree.task.task_id, parent_id);
        assert_eq!(tree.subtasks.len(), 2);
        let ids: std::collections::HashSet<_> = tree.subtasks.iter().map(|t| t.task.task_id.clone()).collect();
        assert_eq!(ids, [child1, child2].into_iter().collect());
    }

    #[test]
    fn block_reuses_handover_for_reason() {
        let store = OpsStore::open_in_memory().unwrap();
        let task_id = store.create("Blocked task", None, None, None).unwrap();
        assert!(store.block(&task_id, "Waiting for dependencies").unwrap());
        let task = store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Blocked);
        assert_eq!(task.handover.as_deref(), Some("Waiting for dependencies"));
    }

    #[test]
    fn list_filters_by_status_and_assignee() {
        let store = OpsStore::open_in_memory().unwrap();
        let _t1 = store.create("Open task 1", None, None, None).unwrap();
        let _t2 = store.create("Open task 2", None, None, None).unwrap();
        let t3 = store.create("Claimed task", None, None, None).unwrap();
        store.claim(&t3, "agent-1").unwrap();

        assert_eq!(store.list_tasks(Some(TaskStatus::Open), None, None).unwrap().len(), 2);
        assert_eq!(store.list_tasks(Some(TaskStatus::Claimed), None, None).unwrap().len(), 1);
        let agent1_tasks = store.list_tasks(None, Some("agent-1"), None).unwrap();
        assert_eq!(agent1_tasks.len(), 1);
        assert_eq!(agent1_tasks[0].task_id, t3);
    }
}
