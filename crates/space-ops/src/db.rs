use space_store::Migration;

pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_create_tasks",
    sql: "
        CREATE TABLE IF NOT EXISTS tasks (
            task_id     TEXT PRIMARY KEY,
            parent_id   TEXT REFERENCES tasks(task_id),
            description TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'open',
            assigned_to TEXT,
            handover    TEXT,
            channel_id  TEXT,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_assigned ON tasks(assigned_to);
    ",
    tracked_tables: &[],
}];
