use tracing::info;

use lepton_common::names::{deployment_id, validate_name};
use lepton_common::{
    admit, now_ms, Deployment, DeploymentEndpoint, DeploymentPatch, DeploymentState,
    DeploymentStatus, DeploymentSystemSpec, DeploymentUserSpec, Photon, ResourceList,
};
use lepton_meta::StoreError;

use crate::args::WorkspaceConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_deployments(st: &AppState) -> Result<Vec<Deployment>, ApiError> {
    let mut deployments = st.deployments.list().await?;
    deployments.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(deployments)
}

pub async fn get_deployment(st: &AppState, id: &str) -> Result<Deployment, ApiError> {
    Ok(st.deployments.get(id).await?)
}

/// Validates and quota-checks the request, then writes the object. Rolling
/// it out is left to the deployment operator watching the store.
pub async fn create_deployment(
    st: &AppState,
    spec: DeploymentUserSpec,
) -> Result<Deployment, ApiError> {
    st.ensure_writable()?;

    validate_name(&spec.name)?;
    validate_user_spec(st, &spec).await?;
    check_quota(st, &spec.resource_requirement.total()?, None).await?;
    let photon = resolve_photon(st, &spec.photon_id).await?;

    let id = deployment_id(&spec.name);
    let now = now_ms();
    let deployment = Deployment {
        system: system_spec(&st.config, &id, &photon),
        status: DeploymentStatus {
            state: DeploymentState::Starting,
            endpoint: endpoint(&st.config, &id),
        },
        id,
        spec,
        created_at_ms: now,
        updated_at_ms: now,
    };

    st.deployments.create(&deployment.id, &deployment).await?;
    info!(id = %deployment.id, photon = %deployment.spec.photon_id, "deployment created");
    Ok(deployment)
}

pub async fn patch_deployment(
    st: &AppState,
    id: &str,
    patch: DeploymentPatch,
) -> Result<Deployment, ApiError> {
    st.ensure_writable()?;

    let current = st.deployments.get_versioned(id).await?;
    let mut deployment = current.object.clone();

    let new_photon = match patch.new_photon_id() {
        Some(photon_id) => {
            let photon = resolve_photon(st, photon_id).await?;
            if photon.name() != deployment.system.photon_name {
                return Err(ApiError::Validation(
                    "can only update to a photon with the same name".to_string(),
                ));
            }
            Some(photon)
        }
        None => None,
    };

    let spec_patched = patch.apply_to(&mut deployment.spec);
    if !spec_patched && patch.new_image().is_none() {
        return Err(ApiError::Validation("no valid field to patch".to_string()));
    }
    validate_user_spec(st, &deployment.spec).await?;

    let old_total = current.object.spec.resource_requirement.total()?;
    check_quota(st, &deployment.spec.resource_requirement.total()?, Some(&old_total)).await?;

    if let Some(photon) = new_photon {
        deployment.system.image = st.config.rewrite_image(&photon.spec.image);
    }
    if let Some(image) = patch.new_image() {
        deployment.system.image = st.config.rewrite_image(image);
    }
    deployment.status.state = DeploymentState::Updating;
    deployment.updated_at_ms = now_ms();

    st.deployments
        .update_at(id, &deployment, current.revision)
        .await?;
    info!(id = %id, "deployment patched");
    Ok(deployment)
}

pub async fn delete_deployment(st: &AppState, id: &str) -> Result<(), ApiError> {
    st.ensure_writable()?;
    st.deployments.delete(id).await?;
    info!(id = %id, "deployment deleted");
    Ok(())
}

/// Checks everything in a user spec that does not depend on the name.
async fn validate_user_spec(st: &AppState, spec: &DeploymentUserSpec) -> Result<(), ApiError> {
    spec.resource_requirement.validate()?;

    for env in spec.envs.iter().flatten() {
        env.validate()?;
    }
    for mount in spec.mounts.iter().flatten() {
        mount.validate()?;
    }

    for name in spec.envs.iter().flatten().filter_map(|e| e.secret_ref()) {
        match st.secrets.get(name).await {
            Ok(_) => {}
            Err(StoreError::NotFound { .. }) => {
                return Err(ApiError::NotFound(format!("secret {name} does not exist")));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn check_quota(
    st: &AppState,
    requested: &ResourceList,
    current: Option<&ResourceList>,
) -> Result<(), ApiError> {
    let quota = st.quota().await?;
    if admit(quota.as_ref(), requested, current) {
        return Ok(());
    }
    Err(ApiError::Validation(format!(
        "resource requirement exceeds quota: requested cpu={} memory={}Mi accelerators={}",
        requested.cpu, requested.memory, requested.accelerator_num
    )))
}

pub(crate) async fn resolve_photon(st: &AppState, photon_id: &str) -> Result<Photon, ApiError> {
    match st.photons.get(photon_id).await {
        Ok(p) => Ok(p),
        Err(StoreError::NotFound { .. }) => {
            Err(ApiError::NotFound(format!("photon {photon_id} does not exist")))
        }
        Err(e) => Err(e.into()),
    }
}

fn system_spec(cfg: &WorkspaceConfig, id: &str, photon: &Photon) -> DeploymentSystemSpec {
    DeploymentSystemSpec {
        image: cfg.rewrite_image(&photon.spec.image),
        photon_name: photon.name().to_string(),
        bucket_path: cfg.bucket_path(id),
        efs_path: cfg.efs_path(),
        root_domain: cfg.root_domain.clone(),
        workspace_token: cfg.workspace_token.clone(),
        certificate_arn: cfg.certificate_arn.clone(),
    }
}

fn endpoint(cfg: &WorkspaceConfig, id: &str) -> DeploymentEndpoint {
    let domain = cfg.deployment_domain(id);
    DeploymentEndpoint {
        internal_endpoint: format!("http://{id}.{}.svc.cluster.local:8080", cfg.namespace),
        external_endpoint: if domain.is_empty() {
            String::new()
        } else {
            format!("https://{domain}")
        },
    }
}
