/// Outcome of invoking the `spawn` command for one mentioned identity
/// (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerResult {
    /// Non-zero exit, spawn failure, or an I/O error starting the process.
    Failed { identity: String, reason: String },
    /// The subprocess exceeded its bounded timeout and was abandoned.
    TimedOut { identity: String },
    /// The subprocess exited 0 but produced no usable stdout.
    Empty { identity: String },
    /// The subprocess exited 0 with non-empty stdout, not yet posted.
    Success { identity: String, output: String },
    /// Non-empty output, already posted back to the channel as a new
    /// message attributed to `identity`.
    Posted { identity: String, message_id: String },
}

impl WorkerResult {
    pub fn identity(&self) -> &str {
        match self {
            WorkerResult::Failed { identity, .. }
            | WorkerResult::TimedOut { identity }
            | WorkerResult::Empty { identity }
            | WorkerResult::Success { identity, .. }
            | WorkerResult::Posted { identity, .. } => identity,
        }
    }
}
