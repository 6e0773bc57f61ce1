use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lepton_common::{now_ms, Deployment};
use lepton_meta::{backup_until_success, sleep_or_cancel, BackupSchedule, ObjectStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSchedule {
    /// Bound on one backup attempt and on each store call of a pass.
    pub attempt_timeout: Duration,
    /// Wait after a failed backup or a pass with failed updates.
    pub retry_interval: Duration,
    /// Wait after a pass that converged every deployment.
    pub recheck_interval: Duration,
}

impl Default for LifecycleSchedule {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(3 * 60),
            retry_interval: Duration::from_secs(5 * 60),
            recheck_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl LifecycleSchedule {
    fn backup_schedule(&self) -> BackupSchedule {
        BackupSchedule {
            attempt_timeout: self.attempt_timeout,
            success_interval: self.recheck_interval,
            retry_interval: self.retry_interval,
        }
    }
}

/// Runs until cancelled: backs up the deployments until a backup succeeds,
/// then scales every deployment to zero replicas, over and over. The
/// backup comes first so the scale-down can be undone from the snapshot.
pub async fn terminated_workspace_loop(
    deployments: ObjectStore<Deployment>,
    schedule: LifecycleSchedule,
    cancel: CancellationToken,
) {
    info!(namespace = %deployments.namespace(), "workspace terminated, backing up deployments");
    if !backup_until_success(&deployments, &schedule.backup_schedule(), &cancel).await {
        return;
    }

    let store = deployments.with_timeout(schedule.attempt_timeout);
    loop {
        let wait = if scale_to_zero(&store).await {
            schedule.recheck_interval
        } else {
            schedule.retry_interval
        };
        if !sleep_or_cancel(wait, &cancel).await {
            info!("workspace lifecycle loop stopped");
            return;
        }
    }
}

/// One convergence pass. Returns whether every deployment is at zero.
pub async fn scale_to_zero(store: &ObjectStore<Deployment>) -> bool {
    let deployments = match store.list().await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "failed to list deployments");
            return false;
        }
    };

    let mut all_ok = true;
    for d in deployments {
        if matches!(d.spec.resource_requirement.min_replicas, None | Some(0)) {
            continue;
        }
        match scale_one_to_zero(store, &d.id).await {
            Ok(()) => info!(id = %d.id, "deployment scaled to zero"),
            Err(e) => {
                warn!(id = %d.id, error = %e, "failed to scale deployment to zero");
                all_ok = false;
            }
        }
    }
    all_ok
}

async fn scale_one_to_zero(store: &ObjectStore<Deployment>, id: &str) -> Result<(), StoreError> {
    let current = store.get_versioned(id).await?;
    let mut d = current.object;
    if matches!(d.spec.resource_requirement.min_replicas, None | Some(0)) {
        return Ok(());
    }
    d.spec.resource_requirement.min_replicas = Some(0);
    d.updated_at_ms = now_ms();
    store.update_at(id, &d, current.revision).await?;
    Ok(())
}
