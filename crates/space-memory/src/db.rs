use space_store::Migration;

pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_create_memories",
    sql: "
        CREATE TABLE IF NOT EXISTS memories (
            memory_id       TEXT PRIMARY KEY,
            agent_id        TEXT NOT NULL,
            topic           TEXT NOT NULL,
            message         TEXT NOT NULL,
            timestamp       TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            archived_at     TEXT,
            core            INTEGER NOT NULL DEFAULT 0,
            source          TEXT NOT NULL DEFAULT 'manual',
            bridge_channel  TEXT,
            code_anchors    TEXT,
            synthesis_note  TEXT,
            supersedes      TEXT,
            superseded_by   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_memories_agent_topic ON memories(agent_id, topic);
        CREATE INDEX IF NOT EXISTS idx_memories_agent_created ON memories(agent_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_memories_archived ON memories(archived_at);
        CREATE INDEX IF NOT EXISTS idx_memories_core ON memories(core);
    ",
    tracked_tables: &[],
}];
