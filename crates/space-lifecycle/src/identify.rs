use serde_json::json;

use space_core::SpaceConfig;
use space_events::EventStore;
use space_registry::{extract_role, inject_identity, RegistryStore};

use crate::error::Result;

/// Maps a role's configured `base_identity` (the CLI client it launches
/// under) to the identity file that client reads at startup
/// (`spawn.py::_write_identity_file`'s `filename_map`).
fn identity_filename(base_identity: &str) -> Option<&'static str> {
    match base_identity {
        "claude" => Some("CLAUDE.md"),
        "gemini" => Some("GEMINI.md"),
        "codex" => Some("AGENTS.md"),
        _ => None,
    }
}

/// Provenance hook every identity-bearing command calls first (spec §4.9):
/// records that `identity` invoked `command`, then — best-effort —
/// assembles the role's constitution, hashes it, upserts it in the
/// registry, and writes it to the root's base-identity file (`CLAUDE.md`,
/// `GEMINI.md`, or `AGENTS.md`, per the role's configured `base_identity`).
///
/// The audit event fires unconditionally: provenance tracking doesn't
/// depend on the role having a constitution configured. Only the
/// constitution step is best-effort, returning `Ok(None)` for the hash
/// when the role isn't configured, its constitution file is missing, or
/// its `base_identity` has no known identity file — mirroring
/// `constitute_identity` swallowing `FileNotFoundError`/`ValueError`
/// rather than failing the calling command.
pub fn identify(
    config: &SpaceConfig,
    registry: &RegistryStore,
    events: &EventStore,
    identity: &str,
    command: &str,
) -> Result<Option<String>> {
    let role = extract_role(identity);
    let agent_id = registry.ensure_agent(identity)?;

    let hash = constitute(config, registry, &role, identity)?;
    events.emit(
        "identity",
        command,
        Some(&agent_id),
        Some(json!({ "constitution_hash": hash, "role": role })),
    )?;

    Ok(hash)
}

/// The best-effort half of `identify`: writes the role's constitution to
/// its base-identity file and returns its hash, or `None` if anything
/// about the role's setup is missing.
fn constitute(config: &SpaceConfig, registry: &RegistryStore, role: &str, identity: &str) -> Result<Option<String>> {
    let Some(constitution_path) = config.constitution_path(role) else {
        return Ok(None);
    };
    let Ok(base_constitution) = std::fs::read_to_string(&constitution_path) else {
        return Ok(None);
    };
    let Some(base_identity) = config.roles.roles.get(role).and_then(|r| r.base_identity.as_deref()) else {
        return Ok(None);
    };
    let Some(filename) = identity_filename(base_identity) else {
        return Ok(None);
    };

    let model = config.model_for_role(role);
    let full_identity = inject_identity(&base_constitution, role, identity, model.as_deref(), &config.canon_dir())?;
    let hash = registry.save_constitution(&full_identity)?;

    std::fs::write(config.workspace_root.join(filename), &full_identity)?;

    Ok(Some(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn setup(dir: &std::path::Path) -> SpaceConfig {
        std::fs::create_dir_all(dir.join("constitutions")).unwrap();
        std::fs::write(dir.join("constitutions/researcher.md"), "Study things.").unwrap();

        let mut roles = std::collections::HashMap::new();
        roles.insert(
            "researcher".to_string(),
            space_core::config::RoleConfig {
                constitution: "researcher.md".to_string(),
                base_identity: Some("codex".to_string()),
            },
        );
        let mut agents = std::collections::HashMap::new();
        agents.insert("codex".to_string(), space_core::config::AgentProfile { model: Some("opus".to_string()) });

        let mut config = SpaceConfig::default();
        config.workspace_root = dir.to_path_buf();
        config.roles = space_core::config::RolesConfig { roles, agents };
        config
    }

    #[test]
    fn identify_writes_constitution_and_emits_event() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let registry = Arc::new(RegistryStore::open_in_memory().unwrap());
        let events = Arc::new(EventStore::open_in_memory().unwrap());

        let hash = identify(&config, &registry, &events, "researcher-7", "wake").unwrap();
        assert!(hash.is_some());
        assert!(dir.path().join("AGENTS.md").exists());

        let agent_id = registry.get_agent_id("researcher-7").unwrap().unwrap();
        let found = events.query(&space_events::EventQuery::new().source("identity").agent_id(agent_id)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_type, "wake");
    }

    #[test]
    fn identify_still_records_provenance_for_unconfigured_role() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SpaceConfig::default();
        config.workspace_root = dir.path().to_path_buf();
        let registry = Arc::new(RegistryStore::open_in_memory().unwrap());
        let events = Arc::new(EventStore::open_in_memory().unwrap());

        let result = identify(&config, &registry, &events, "ghost-1", "wake").unwrap();
        assert!(result.is_none());
        assert!(!dir.path().join("CLAUDE.md").exists());

        let agent_id = registry.get_agent_id("ghost-1").unwrap().unwrap();
        let found = events.query(&space_events::EventQuery::new().source("identity").agent_id(agent_id)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_type, "wake");
    }
}
