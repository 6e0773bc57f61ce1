use std::sync::Arc;

use lepton_common::{
    Deployment, Photon, Pod, PodEvent, Secret, WorkspaceResourceQuota, WorkspaceState,
};
use lepton_meta::{BlobStore, MetaStore, ObjectStore, StoreError};

use crate::args::WorkspaceConfig;
use crate::error::ApiError;

/// Dependencies shared by every request handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WorkspaceConfig>,
    pub photons: ObjectStore<Photon>,
    pub deployments: ObjectStore<Deployment>,
    pub secrets: ObjectStore<Secret>,
    // Written by the deployment operator and the cluster; read-only here.
    pub pods: ObjectStore<Pod>,
    pub events: ObjectStore<PodEvent>,
    pub quotas: ObjectStore<WorkspaceResourceQuota>,
}

impl AppState {
    pub fn new(
        config: WorkspaceConfig,
        meta: Arc<dyn MetaStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let ns = config.namespace.clone();
        Self {
            photons: ObjectStore::new(meta.clone(), blobs.clone(), ns.clone()),
            deployments: ObjectStore::new(meta.clone(), blobs.clone(), ns.clone()),
            secrets: ObjectStore::new(meta.clone(), blobs.clone(), ns.clone()),
            pods: ObjectStore::new(meta.clone(), blobs.clone(), ns.clone()),
            events: ObjectStore::new(meta.clone(), blobs.clone(), ns.clone()),
            quotas: ObjectStore::new(meta, blobs, ns),
            config: Arc::new(config),
        }
    }

    pub fn workspace_state(&self) -> WorkspaceState {
        self.config.state
    }

    /// Rejects mutating requests while the workspace is paused or terminated.
    pub fn ensure_writable(&self) -> Result<(), ApiError> {
        let state = self.workspace_state();
        if state.is_writable() {
            Ok(())
        } else {
            Err(ApiError::WorkspaceNotWritable(state))
        }
    }

    /// The workspace quota, or `None` when the workspace is unlimited.
    pub async fn quota(&self) -> Result<Option<WorkspaceResourceQuota>, StoreError> {
        match self.quotas.get(&self.config.workspace_name).await {
            Ok(q) => Ok(Some(q)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use lepton_meta::{MemoryBlobStore, MemoryMetaStore};

    use super::*;

    pub fn config(state: WorkspaceState) -> WorkspaceConfig {
        WorkspaceConfig {
            namespace: "ws-test".to_string(),
            workspace_name: "test".to_string(),
            state,
            bucket_name: "lepton-test".to_string(),
            efs_id: "fs-0123".to_string(),
            root_domain: "cloud.example.com".to_string(),
            workspace_token: "tok".to_string(),
            certificate_arn: String::new(),
            image_registry: String::new(),
        }
    }

    pub fn state_with(state: WorkspaceState) -> (AppState, MemoryBlobStore) {
        let blobs = MemoryBlobStore::new();
        let st = AppState::new(
            config(state),
            Arc::new(MemoryMetaStore::new()),
            Arc::new(blobs.clone()),
        );
        (st, blobs)
    }

    pub fn app_state() -> AppState {
        state_with(WorkspaceState::Normal).0
    }
}
