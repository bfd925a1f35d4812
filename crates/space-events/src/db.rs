use space_store::Migration;

pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_create_events",
    sql: "CREATE TABLE IF NOT EXISTS events (
            id         TEXT PRIMARY KEY,
            source     TEXT NOT NULL,
            event_type TEXT NOT NULL,
            agent_id   TEXT,
            data       TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_source ON events(source, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_events_agent ON events(agent_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type, created_at DESC);",
    tracked_tables: &[],
}];
