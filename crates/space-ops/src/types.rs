use serde::{Deserialize, Serialize};

/// Lifecycle state of a task (spec §4's ops table, `ops/api`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Open,
    Claimed,
    Complete,
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Complete => "complete",
            Self::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "claimed" => Ok(Self::Claimed),
            "complete" => Ok(Self::Complete),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A node in the optional task tree (spec §4: `task_id`, `parent_id`,
/// `description`, `status`, `assigned_to`, `handover`, `channel_id`,
/// `created_at`), grounded in `ops/api/__init__.py`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub parent_id: Option<String>,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub handover: Option<String>,
    pub channel_id: Option<String>,
    pub created_at: String,
}

/// Recursive hierarchy returned by `tree` (`ops/api::tree`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTree {
    pub task: Task,
    pub subtasks: Vec<TaskTree>,
}
