use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::{Result, StoreError};

/// One forward-only schema change, applied at most once per database file
/// and tracked in the `_migrations` ledger.
///
/// `tracked_tables` lists tables this migration touches that already exist
/// (not tables it creates) — `apply_migrations` refuses to commit a
/// migration that leaves any of them with fewer rows than it started with.
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
    pub tracked_tables: &'static [&'static str],
}

/// Open a SQLite connection tuned for a single-writer, many-reader CLI tool:
/// WAL so readers never block on a writer, a busy timeout so concurrent
/// invocations queue instead of failing immediately, and foreign keys on.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Run every migration in `migrations` that hasn't already been recorded in
/// `_migrations`, in order, each in its own transaction with a row-count
/// safeguard (spec §4.1): if a migration would drop rows from a table it
/// already owned, the transaction is rolled back and `Migration` is
/// returned instead of silently losing data.
#[instrument(skip(conn, migrations))]
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name       TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    for migration in migrations {
        let already_applied: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = ?1)",
            [migration.name],
            |row| row.get(0),
        )?;
        if already_applied {
            continue;
        }

        let before = row_counts(conn, migration.tracked_tables)?;

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;

        let after = row_counts(&tx, migration.tracked_tables)?;
        for (table, before_count) in &before {
            let after_count = after.get(table).copied().unwrap_or(0);
            if after_count < *before_count {
                // tx drops here without commit — the destructive change never lands.
                return Err(StoreError::Migration(format!(
                    "migration '{}' would drop rows from '{table}': {before_count} -> {after_count}",
                    migration.name,
                )));
            }
        }

        tx.execute(
            "INSERT INTO _migrations (name, applied_at) VALUES (?1, datetime('now'))",
            [migration.name],
        )?;
        tx.commit()?;

        info!(migration = migration.name, "applied migration");
    }

    Ok(())
}

fn row_counts(conn: &Connection, tables: &[&str]) -> Result<HashMap<String, i64>> {
    let mut counts = HashMap::new();
    for table in tables {
        let result: rusqlite::Result<i64> =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0));
        let count = match result {
            Ok(c) => c,
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg))) if msg.contains("no such table") => 0,
            Err(e) => return Err(e.into()),
        };
        counts.insert((*table).to_string(), count);
    }
    Ok(counts)
}

/// Force a WAL checkpoint, flushing the write-ahead log back into the main
/// database file. Useful before copying the database file for a backup.
pub fn checkpoint(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "wal_checkpoint", "TRUNCATE")?;
    Ok(())
}

/// Path of the advisory lock file used to serialize backups within a
/// workspace's `.space/` directory.
pub fn backup_lock_path(store_dir: &Path) -> std::path::PathBuf {
    store_dir.join(".backup.lock")
}

/// Advisory, filesystem-marker lock held for the duration of a backup.
/// Not an OS-level flock — sufficient to stop two `space backup` runs in
/// the same workspace from racing, which is the only caller of this type.
pub struct BackupGuard {
    path: std::path::PathBuf,
}

impl BackupGuard {
    pub fn acquire(store_dir: &Path) -> Result<Self> {
        let path = backup_lock_path(store_dir);
        if path.exists() {
            return Err(StoreError::Locked(format!(
                "backup already in progress: {}",
                path.display()
            )));
        }
        std::fs::write(&path, b"")?;
        Ok(Self { path })
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATIONS: &[Migration] = &[
        Migration {
            name: "0001_create_widgets",
            sql: "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
            tracked_tables: &[],
        },
        Migration {
            name: "0002_seed_widget",
            sql: "INSERT INTO widgets (name) VALUES ('a');",
            tracked_tables: &["widgets"],
        },
    ];

    #[test]
    fn apply_migrations_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn, MIGRATIONS).unwrap();
        apply_migrations(&mut conn, MIGRATIONS).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM widgets", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1, "second pass must not re-run the seed migration");
    }

    #[test]
    fn apply_migrations_rejects_row_loss() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn, MIGRATIONS).unwrap();

        let destructive: &[Migration] = &[Migration {
            name: "0003_drop_widget",
            sql: "DELETE FROM widgets;",
            tracked_tables: &["widgets"],
        }];
        let err = apply_migrations(&mut conn, destructive).unwrap_err();
        assert!(matches!(err, StoreError::Migration(_)));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM widgets", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1, "rejected migration must not commit its damage");
    }

    #[test]
    fn backup_guard_rejects_concurrent_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let first = BackupGuard::acquire(dir.path()).unwrap();
        let second = BackupGuard::acquire(dir.path());
        assert!(second.is_err());
        drop(first);
        assert!(BackupGuard::acquire(dir.path()).is_ok());
    }
}
