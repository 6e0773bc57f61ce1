pub mod args;
pub mod deployments;
pub mod diagnosis;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod photons;
pub mod secrets;
pub mod state;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lepton_common::WorkspaceState;
use lepton_meta::{backup_loop, BackupSchedule};

use crate::lifecycle::{terminated_workspace_loop, LifecycleSchedule};
use crate::state::AppState;

/// Starts the backup loop of every user-owned kind and, for a terminated
/// workspace, the scale-to-zero loop. All of them stop when `cancel` fires.
pub fn spawn_background_tasks(
    st: &AppState,
    backup: BackupSchedule,
    lifecycle: LifecycleSchedule,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut tasks = vec![
        tokio::spawn(backup_loop(st.photons.clone(), backup, cancel.clone())),
        tokio::spawn(backup_loop(st.deployments.clone(), backup, cancel.clone())),
        tokio::spawn(backup_loop(st.secrets.clone(), backup, cancel.clone())),
    ];
    if st.workspace_state() == WorkspaceState::Terminated {
        tasks.push(tokio::spawn(terminated_workspace_loop(
            st.deployments.clone(),
            lifecycle,
            cancel.clone(),
        )));
    }
    tasks
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lepton_meta::BlobStore;

    use super::*;
    use crate::state::testing::state_with;

    #[tokio::test]
    async fn background_tasks_follow_workspace_state() {
        let backup = BackupSchedule::default().with_success_interval(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let (normal, blobs) = state_with(WorkspaceState::Normal);
        let tasks = spawn_background_tasks(&normal, backup, LifecycleSchedule::default(), &cancel);
        assert_eq!(tasks.len(), 3);

        let (terminated, _) = state_with(WorkspaceState::Terminated);
        let more =
            spawn_background_tasks(&terminated, backup, LifecycleSchedule::default(), &cancel);
        assert_eq!(more.len(), 4);

        // Every loop backs up right away, even an empty store.
        let keys = [
            normal.photons.backup_key(),
            normal.deployments.backup_key(),
            normal.secrets.backup_key(),
        ];
        let mut written = 0;
        for _ in 0..200 {
            written = 0;
            for key in &keys {
                if blobs.get(key).await.unwrap().is_some() {
                    written += 1;
                }
            }
            if written == keys.len() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(written, keys.len());

        cancel.cancel();
        for t in tasks.into_iter().chain(more) {
            tokio::time::timeout(Duration::from_secs(1), t).await.unwrap().unwrap();
        }
    }
}
