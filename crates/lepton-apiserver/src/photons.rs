use tracing::info;

use lepton_common::names::validate_name;
use lepton_common::{now_ms, Photon, PhotonSpec};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_photons(st: &AppState) -> Result<Vec<Photon>, ApiError> {
    let mut photons = st.photons.list().await?;
    photons.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(photons)
}

pub async fn get_photon(st: &AppState, id: &str) -> Result<Photon, ApiError> {
    Ok(st.photons.get(id).await?)
}

/// Registers a photon. Its ID is content-addressed, so uploading the same
/// metadata twice conflicts with the first upload.
pub async fn create_photon(st: &AppState, spec: PhotonSpec) -> Result<Photon, ApiError> {
    st.ensure_writable()?;
    validate_name(&spec.name)?;
    if spec.image.is_empty() {
        return Err(ApiError::Validation("photon image must be set".to_string()));
    }

    let photon = Photon::new(spec, now_ms());
    st.photons.create(&photon.id, &photon).await?;
    info!(id = %photon.id, "photon created");
    Ok(photon)
}

/// Deletes a photon unless a deployment still runs it.
pub async fn delete_photon(st: &AppState, id: &str) -> Result<(), ApiError> {
    st.ensure_writable()?;

    let deployments = st.deployments.list().await?;
    if let Some(d) = deployments.iter().find(|d| d.spec.photon_id == id) {
        return Err(ApiError::Conflict(format!(
            "photon {id} is used by deployment {}",
            d.id
        )));
    }

    st.photons.delete(id).await?;
    info!(id = %id, "photon deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use lepton_common::{DeploymentUserSpec, ResourceRequirement};

    use super::*;
    use crate::deployments::create_deployment;
    use crate::state::testing::app_state;

    fn spec(name: &str) -> PhotonSpec {
        PhotonSpec {
            name: name.to_string(),
            model: "hf:gpt2".to_string(),
            image: "lepton/runner:0.1".to_string(),
            exposed_paths: vec![],
            requirement_dependency: vec![],
            entrypoint: None,
            openapi_schema: None,
            labels: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn create_list_delete() {
        let st = app_state();
        let p = create_photon(&st, spec("gpt2")).await.unwrap();
        assert!(p.id.starts_with("gpt2-"));
        assert_eq!(list_photons(&st).await.unwrap(), vec![p.clone()]);

        assert!(matches!(
            create_photon(&st, spec("gpt2")).await.unwrap_err(),
            ApiError::Conflict(_)
        ));

        delete_photon(&st, &p.id).await.unwrap();
        assert!(matches!(get_photon(&st, &p.id).await.unwrap_err(), ApiError::NotFound(_)));
        assert!(matches!(delete_photon(&st, &p.id).await.unwrap_err(), ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_specs() {
        let st = app_state();
        assert!(matches!(
            create_photon(&st, spec("9lives")).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        let mut no_image = spec("gpt2");
        no_image.image.clear();
        assert!(matches!(
            create_photon(&st, no_image).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn referenced_photon_cannot_be_deleted() {
        let st = app_state();
        let p = create_photon(&st, spec("gpt2")).await.unwrap();
        create_deployment(
            &st,
            DeploymentUserSpec {
                name: "chat".to_string(),
                photon_id: p.id.clone(),
                resource_requirement: ResourceRequirement {
                    resource_shape: "cpu.small".to_string(),
                    min_replicas: Some(1),
                    ..Default::default()
                },
                api_tokens: None,
                envs: None,
                mounts: None,
            },
        )
        .await
        .unwrap();

        let err = delete_photon(&st, &p.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m.contains("chat")));
        assert!(get_photon(&st, &p.id).await.is_ok());
    }
}
