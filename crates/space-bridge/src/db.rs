use space_store::Migration;

/// A channel whose unread-count semantics are special-cased: `get_new_messages`
/// on this channel always returns only the single most recent message,
/// regardless of bookmark — load-bearing for sleep/wake summaries
/// (spec §9; `bridge/db.py::get_new_messages`).
pub const SUMMARY_CHANNEL: &str = "summary";

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_create_bridge",
        sql: "CREATE TABLE IF NOT EXISTS channels (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                topic       TEXT,
                created_at  TEXT NOT NULL,
                archived_at TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_channels_active_name
                ON channels(name) WHERE archived_at IS NULL;
            CREATE TABLE IF NOT EXISTS messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL REFERENCES channels(id),
                agent_id   TEXT NOT NULL,
                content    TEXT NOT NULL,
                priority   TEXT NOT NULL DEFAULT 'normal',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages(channel_id, id);
            CREATE INDEX IF NOT EXISTS idx_messages_agent ON messages(agent_id, created_at DESC);
            CREATE TABLE IF NOT EXISTS bookmarks (
                agent_id     TEXT NOT NULL,
                channel_id   TEXT NOT NULL REFERENCES channels(id),
                last_seen_id INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (agent_id, channel_id)
            );
            CREATE TABLE IF NOT EXISTS notes (
                note_id    TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL REFERENCES channels(id),
                author     TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notes_channel ON notes(channel_id, created_at);",
        tracked_tables: &[],
    },
    // `messages.id` started as the legacy autoincrement integer (spec §3:
    // "legacy schemas used autoincrement integers; migration must convert
    // to text ids while preserving order"). Each row's new id embeds its
    // old integer id, zero-padded, as the leading 8 hex digits — the
    // position a real `space_ids::uuid7()` id spends on its millisecond
    // timestamp. That keeps migrated ids sorting in their original
    // insertion order among themselves, and before every future
    // `uuid7()`-stamped message (whose timestamp digits are astronomically
    // larger than any realistic legacy row count), so `ORDER BY id` and
    // the `> last_seen_id` bookmark comparisons keep working unchanged.
    // Version/variant nibbles are set so the result reads as a (degenerate)
    // UUIDv7. `bookmarks.last_seen_id` is remapped through the same table
    // before the old integer ids are discarded.
    Migration {
        name: "0002_messages_text_ids",
        sql: "
            ALTER TABLE messages RENAME TO messages_legacy;
            CREATE TABLE messages (
                id         TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL REFERENCES channels(id),
                agent_id   TEXT NOT NULL,
                content    TEXT NOT NULL,
                priority   TEXT NOT NULL DEFAULT 'normal',
                created_at TEXT NOT NULL,
                legacy_id  INTEGER
            );
            INSERT INTO messages (id, channel_id, agent_id, content, priority, created_at, legacy_id)
            SELECT
                printf('%08x-%04x-7%03x-a%03x-%012x',
                    id,
                    abs(random()) % 65536,
                    abs(random()) % 4096,
                    (abs(random()) % 4096) | 2048,
                    abs(random()) % 281474976710656
                ),
                channel_id, agent_id, content, priority, created_at, id
            FROM messages_legacy
            ORDER BY id ASC;
            CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages(channel_id, id);
            CREATE INDEX IF NOT EXISTS idx_messages_agent ON messages(agent_id, created_at DESC);

            ALTER TABLE bookmarks RENAME TO bookmarks_legacy;
            CREATE TABLE bookmarks (
                agent_id     TEXT NOT NULL,
                channel_id   TEXT NOT NULL REFERENCES channels(id),
                last_seen_id TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (agent_id, channel_id)
            );
            INSERT INTO bookmarks (agent_id, channel_id, last_seen_id)
            SELECT b.agent_id, b.channel_id, COALESCE(m.id, '')
            FROM bookmarks_legacy b
            LEFT JOIN messages m ON m.legacy_id = b.last_seen_id;

            ALTER TABLE messages DROP COLUMN legacy_id;
            DROP TABLE bookmarks_legacy;
            DROP TABLE messages_legacy;
        ",
        tracked_tables: &["messages", "bookmarks"],
    },
];
