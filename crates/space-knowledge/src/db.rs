use space_store::Migration;

pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_create_knowledge",
    sql: "
        CREATE TABLE IF NOT EXISTS knowledge (
            knowledge_id TEXT PRIMARY KEY,
            domain       TEXT NOT NULL,
            agent_id     TEXT NOT NULL,
            content      TEXT NOT NULL,
            confidence   REAL,
            created_at   TEXT NOT NULL,
            archived_at  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_knowledge_domain ON knowledge(domain);
        CREATE INDEX IF NOT EXISTS idx_knowledge_agent ON knowledge(agent_id);
        CREATE INDEX IF NOT EXISTS idx_knowledge_archived ON knowledge(archived_at);
    ",
    tracked_tables: &[],
}];
