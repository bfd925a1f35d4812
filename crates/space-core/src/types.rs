use std::fmt;

use serde::{Deserialize, Serialize};

/// A registry-issued agent identifier: a UUIDv7 string, or the literal
/// `"system"` sentinel used by system-authored messages and events.
///
/// Time-sortable when not the sentinel — see `space-ids::uuid7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub const SYSTEM: &'static str = "system";

    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A channel's UUID primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Message delivery priority. `Alert` messages surface cross-channel via
/// `get_alerts` regardless of which channel they were posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    #[default]
    Normal,
    Alert,
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Alert => write!(f, "alert"),
        }
    }
}

impl std::str::FromStr for MessagePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "alert" => Ok(Self::Alert),
            other => Err(format!("unknown message priority: {other}")),
        }
    }
}

/// Outcome of resolving a short (suffix) id against a full id column.
///
/// Never return an error by sentinel string — callers branch on this
/// explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortIdResolution {
    Resolved(String),
    NotFound,
    Ambiguous(Vec<String>),
}

/// The base-identity family a materialised constitution file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseIdentity {
    Claude,
    Gemini,
    Codex,
}

impl BaseIdentity {
    /// The identity file materialised at the workspace root for this family.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Claude => "CLAUDE.md",
            Self::Gemini => "GEMINI.md",
            Self::Codex => "AGENTS.md",
        }
    }
}

impl std::str::FromStr for BaseIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Self::Claude),
            "gemini" => Ok(Self::Gemini),
            "codex" => Ok(Self::Codex),
            other => Err(format!("unknown base identity: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_system_sentinel() {
        assert!(AgentId::system().is_system());
        assert!(!AgentId::from("not-system").is_system());
    }

    #[test]
    fn priority_roundtrip() {
        assert_eq!("alert".parse::<MessagePriority>().unwrap(), MessagePriority::Alert);
        assert_eq!(MessagePriority::Normal.to_string(), "normal");
    }
}
