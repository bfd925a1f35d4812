use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{instrument, warn};

use crate::types::WorkerResult;

/// Run `spawn_command identity prompt --channel channel_name`, bounded by
/// `timeout`, capturing at most `max_stdout_bytes` of stdout (spec §4.6:
/// each mention gets its own subprocess with a wall-clock budget and a
/// bounded capture so a runaway agent can't exhaust memory). Stdin is
/// closed — the subprocess gets its context from argv, not from input
/// it could block reading (`bridge/worker.py`'s `stdin=subprocess.DEVNULL`).
///
/// Returns `Success` with the trimmed output on a clean, non-empty run;
/// never posts anything back to the channel itself — the caller decides
/// whether and how to post.
#[instrument(skip(prompt), fields(identity = %identity))]
pub async fn run_spawn(
    spawn_command: &str,
    identity: &str,
    prompt: &str,
    channel_name: &str,
    timeout: Duration,
    max_stdout_bytes: usize,
) -> WorkerResult {
    match tokio::time::timeout(timeout, invoke(spawn_command, identity, prompt, channel_name, max_stdout_bytes)).await
    {
        Ok(Ok(stdout)) => {
            let trimmed = stdout.trim();
            if trimmed.is_empty() {
                WorkerResult::Empty { identity: identity.to_string() }
            } else {
                WorkerResult::Success { identity: identity.to_string(), output: trimmed.to_string() }
            }
        }
        Ok(Err(reason)) => {
            warn!(%reason, "spawn failed");
            WorkerResult::Failed { identity: identity.to_string(), reason }
        }
        Err(_) => WorkerResult::TimedOut { identity: identity.to_string() },
    }
}

async fn invoke(
    spawn_command: &str,
    identity: &str,
    prompt: &str,
    channel_name: &str,
    max_stdout_bytes: usize,
) -> Result<String, String> {
    let output = Command::new(spawn_command)
        .arg(identity)
        .arg(prompt)
        .arg("--channel")
        .arg(channel_name)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("spawn error: {e}"))?;

    if !output.status.success() {
        return Err(format!("exit status {}", output.status));
    }

    let mut stdout = output.stdout;
    stdout.truncate(max_stdout_bytes);
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}
