use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exit_code::code_to_error;
use crate::pod::ContainerStatus;

/// Reason the runtime reports for a container that exited on its own accord.
const REASON_COMPLETED: &str = "Completed";

/// Why a container last exited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaTermination {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: i32,
    pub reason: String,
    pub message: String,
}

/// Extracts the last abnormal termination of every container.
///
/// Clean completions are skipped. An empty reason or message is explained
/// from the exit code.
pub fn diagnose_terminations(statuses: &[ContainerStatus]) -> Vec<ReplicaTermination> {
    statuses
        .iter()
        .filter_map(|s| s.last_state.as_ref()?.terminated.as_ref())
        .filter(|t| t.reason != REASON_COMPLETED)
        .map(|t| {
            let explain = || code_to_error(t.exit_code);
            ReplicaTermination {
                started_at: t.started_at,
                finished_at: t.finished_at,
                exit_code: t.exit_code,
                reason: if t.reason.is_empty() { explain() } else { t.reason.clone() },
                message: if t.message.is_empty() { explain() } else { t.message.clone() },
            }
        })
        .collect()
}
