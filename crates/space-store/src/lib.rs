pub mod db;
pub mod error;

pub use db::{apply_migrations, backup_lock_path, checkpoint, open, BackupGuard, Migration};
pub use error::StoreError;
