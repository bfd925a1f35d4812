use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpaceError};

/// Directory (under the workspace root) holding per-role constitution files.
pub const CONSTITUTIONS_DIR: &str = "constitutions";

/// Workspace marker directory — its presence identifies a directory as a
/// space workspace root (spec §6).
pub const WORKSPACE_MARKER: &str = ".space";
/// Workspace-wide shared markdown corpus injected into every constitution.
pub const CANON_DIR: &str = "canon";
/// Default per-mention wall-clock budget for the worker subprocess (spec §4.6).
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 10;

/// Top-level config (`space.toml` + `SPACE_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Workspace root directory. Resolved by `SpaceConfig::resolve_root`
    /// before loading, then threaded through every subsystem's store.
    #[serde(skip)]
    pub workspace_root: PathBuf,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub roles: RolesConfig,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            database: DatabaseConfig::default(),
            worker: WorkerConfig::default(),
            roles: RolesConfig::default(),
        }
    }
}

/// Role → constitution/base-identity table and base-identity → model
/// table, mirroring the teacher's `spawn.toml` `[roles.<role>]` /
/// `[agents.<base_identity>]` sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,
    #[serde(default)]
    pub agents: HashMap<String, AgentProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Filename of the base constitution under `<root>/constitutions/`.
    pub constitution: String,
    pub base_identity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProfile {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_dir_name")]
    pub dir_name: String,
    #[serde(default = "default_registry_db")]
    pub registry_db: String,
    #[serde(default = "default_bridge_db")]
    pub bridge_db: String,
    #[serde(default = "default_memory_db")]
    pub memory_db: String,
    #[serde(default = "default_knowledge_db")]
    pub knowledge_db: String,
    #[serde(default = "default_events_db")]
    pub events_db: String,
    #[serde(default = "default_ops_db")]
    pub ops_db: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dir_name: default_dir_name(),
            registry_db: default_registry_db(),
            bridge_db: default_bridge_db(),
            memory_db: default_memory_db(),
            knowledge_db: default_knowledge_db(),
            events_db: default_events_db(),
            ops_db: default_ops_db(),
        }
    }
}

/// Worker fan-out tuning (spec §4.6, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_timeout_secs")]
    pub timeout_secs: u64,
    /// Bounded stdout capture to avoid an unbounded buffer from a runaway agent.
    #[serde(default = "default_worker_max_stdout_bytes")]
    pub max_stdout_bytes: usize,
    /// The executable used to launch an agent identity (spec §4.6: `spawn`).
    #[serde(default = "default_spawn_command")]
    pub spawn_command: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_worker_timeout_secs(),
            max_stdout_bytes: default_worker_max_stdout_bytes(),
            spawn_command: default_spawn_command(),
        }
    }
}

fn default_dir_name() -> String {
    WORKSPACE_MARKER.to_string()
}
fn default_registry_db() -> String {
    "registry.db".to_string()
}
fn default_bridge_db() -> String {
    "bridge.db".to_string()
}
fn default_memory_db() -> String {
    "memory.db".to_string()
}
fn default_knowledge_db() -> String {
    "knowledge.db".to_string()
}
fn default_events_db() -> String {
    "events.db".to_string()
}
fn default_ops_db() -> String {
    "ops.db".to_string()
}
fn default_worker_timeout_secs() -> u64 {
    DEFAULT_WORKER_TIMEOUT_SECS
}
fn default_worker_max_stdout_bytes() -> usize {
    256 * 1024
}
fn default_spawn_command() -> String {
    "spawn".to_string()
}

impl SpaceConfig {
    /// Load config from `<root>/space.toml` with `SPACE_*` env var overrides,
    /// then stamp in the resolved workspace root.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let toml_path = root.join("space.toml");

        let mut config: SpaceConfig = Figment::new()
            .merge(Toml::file(&toml_path))
            .merge(Env::prefixed("SPACE_").split("_"))
            .extract()
            .map_err(|e| SpaceError::Validation(format!("config: {e}")))?;

        config.workspace_root = root;
        Ok(config)
    }

    /// Directory holding every per-purpose database (`<root>/.space/`).
    pub fn store_dir(&self) -> PathBuf {
        self.workspace_root.join(&self.database.dir_name)
    }

    /// `<root>/canon/` — the shared markdown corpus injected into every
    /// identity's constitution.
    pub fn canon_dir(&self) -> PathBuf {
        self.workspace_root.join(CANON_DIR)
    }

    /// `<root>/constitutions/<filename>` for the configured role, if any.
    pub fn constitution_path(&self, role: &str) -> Option<PathBuf> {
        let role_cfg = self.roles.roles.get(role)?;
        Some(self.workspace_root.join(CONSTITUTIONS_DIR).join(&role_cfg.constitution))
    }

    /// Model configured for `role`'s base identity, if any.
    pub fn model_for_role(&self, role: &str) -> Option<String> {
        let role_cfg = self.roles.roles.get(role)?;
        let base_identity = role_cfg.base_identity.as_ref()?;
        self.roles.agents.get(base_identity)?.model.clone()
    }

    /// Resolve the workspace root per spec §6: `SPACE_HOME` env var
    /// overrides; otherwise walk up from `start` looking for a `.space/`
    /// marker directory; falling back to `start` itself.
    pub fn resolve_root(start: &Path) -> PathBuf {
        if let Ok(home) = std::env::var("SPACE_HOME") {
            if !home.is_empty() {
                return PathBuf::from(home);
            }
        }

        let mut current = start;
        loop {
            if current.join(WORKSPACE_MARKER).is_dir() {
                return current.to_path_buf();
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return start.to_path_buf(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_root_falls_back_to_start_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = SpaceConfig::resolve_root(dir.path());
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn resolve_root_finds_marker_in_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(WORKSPACE_MARKER)).unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        let resolved = SpaceConfig::resolve_root(&nested);
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn resolve_root_honors_space_home_env() {
        std::env::set_var("SPACE_HOME", "/tmp/space-home-test");
        let resolved = SpaceConfig::resolve_root(Path::new("/irrelevant"));
        std::env::remove_var("SPACE_HOME");
        assert_eq!(resolved, PathBuf::from("/tmp/space-home-test"));
    }
}
