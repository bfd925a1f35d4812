use space_store::Migration;

pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_create_registry",
    sql: "CREATE TABLE IF NOT EXISTS constitutions (
            hash    TEXT PRIMARY KEY,
            content TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS agents (
            id               TEXT PRIMARY KEY,
            name             TEXT NOT NULL UNIQUE,
            self_description TEXT,
            canonical_id     TEXT REFERENCES agents(id),
            created_at       TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS agent_aliases (
            agent_id TEXT NOT NULL REFERENCES agents(id),
            alias    TEXT NOT NULL,
            PRIMARY KEY (agent_id, alias)
        );
        CREATE INDEX IF NOT EXISTS idx_agent_aliases_alias ON agent_aliases(alias);",
    tracked_tables: &[],
}];
