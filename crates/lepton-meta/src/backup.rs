use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lepton_common::Kind;

use crate::object_store::ObjectStore;

/// Timing of the periodic backup of one object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupSchedule {
    /// Bound on a single backup attempt.
    pub attempt_timeout: Duration,
    /// Wait after a successful backup.
    pub success_interval: Duration,
    /// Wait after a failed or timed-out attempt.
    pub retry_interval: Duration,
}

impl Default for BackupSchedule {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(3 * 60),
            success_interval: Duration::from_secs(12 * 60 * 60),
            retry_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl BackupSchedule {
    pub fn with_success_interval(mut self, interval: Duration) -> Self {
        self.success_interval = interval;
        self
    }
}

/// One bounded backup attempt. Failures are logged, never propagated.
pub async fn backup_once<T: Kind>(store: &ObjectStore<T>, schedule: &BackupSchedule) -> bool {
    match tokio::time::timeout(schedule.attempt_timeout, store.backup()).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(kind = T::KIND, namespace = %store.namespace(), error = %e, "backup failed");
            false
        }
        Err(_) => {
            warn!(
                kind = T::KIND,
                namespace = %store.namespace(),
                timeout = ?schedule.attempt_timeout,
                "backup timed out"
            );
            false
        }
    }
}

/// Sleeps for `dur` unless cancelled first. Returns false on cancellation.
pub async fn sleep_or_cancel(dur: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(dur) => true,
    }
}

/// Backs up `store` forever: every `success_interval` after a success,
/// every `retry_interval` after a failure. Returns only once `cancel`
/// fires.
pub async fn backup_loop<T: Kind>(
    store: ObjectStore<T>,
    schedule: BackupSchedule,
    cancel: CancellationToken,
) {
    info!(kind = T::KIND, namespace = %store.namespace(), "backup loop started");
    loop {
        let wait = if backup_once(&store, &schedule).await {
            schedule.success_interval
        } else {
            schedule.retry_interval
        };
        if !sleep_or_cancel(wait, &cancel).await {
            info!(kind = T::KIND, "backup loop stopped");
            return;
        }
    }
}

/// Retries a backup of `store` every `retry_interval` until one succeeds.
/// Returns false if cancelled first.
pub async fn backup_until_success<T: Kind>(
    store: &ObjectStore<T>,
    schedule: &BackupSchedule,
    cancel: &CancellationToken,
) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        if backup_once(store, schedule).await {
            return true;
        }
        if !sleep_or_cancel(schedule.retry_interval, cancel).await {
            return false;
        }
    }
}
