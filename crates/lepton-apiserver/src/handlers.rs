use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use lepton_common::{
    DeploymentPatch, DeploymentUserSpec, PhotonSpec, Secret, WorkspaceResourceQuota,
    WorkspaceState,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::{deployments, diagnosis, photons, secrets};

/// Request bodies are parsed here rather than by the `Json` extractor so a
/// malformed body is reported like any other validation failure.
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(format!("invalid request body: {e}")))
}

fn deleted(id: &str) -> Response {
    (StatusCode::OK, Json(json!({"id": id, "status": "deleted"}))).into_response()
}

pub fn router(st: AppState) -> Router {
    let api = Router::new()
        .route("/healthz", get(healthz))
        .route("/workspace", get(workspace_info))
        .route("/photons", get(list_photons).post(create_photon))
        .route("/photons/:id", get(get_photon).delete(delete_photon))
        .route("/deployments", get(list_deployments).post(create_deployment))
        .route(
            "/deployments/:id",
            get(get_deployment)
                .patch(patch_deployment)
                .delete(delete_deployment),
        )
        .route("/deployments/:id/readiness", get(deployment_readiness))
        .route("/deployments/:id/termination", get(deployment_termination))
        .route("/secrets", get(list_secrets).post(upsert_secrets))
        .route("/secrets/:name", axum::routing::delete(delete_secret))
        .with_state(st);

    Router::new().nest("/api/v1", api)
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Serialize)]
pub struct WorkspaceInfo {
    pub name: String,
    pub state: WorkspaceState,
    /// `None` for unlimited workspaces.
    pub quota: Option<WorkspaceResourceQuota>,
}

pub async fn workspace_info(State(st): State<AppState>) -> Result<Json<WorkspaceInfo>, ApiError> {
    let quota = st.quota().await?;
    Ok(Json(WorkspaceInfo {
        name: st.config.workspace_name.clone(),
        state: st.workspace_state(),
        quota: quota.map(|q| q.without_system_overhead()),
    }))
}

// ---------------------------------------------------------------------------
// Photons

pub async fn list_photons(State(st): State<AppState>) -> Result<Response, ApiError> {
    Ok(Json(photons::list_photons(&st).await?).into_response())
}

pub async fn get_photon(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(Json(photons::get_photon(&st, &id).await?).into_response())
}

pub async fn create_photon(State(st): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let spec: PhotonSpec = parse_json(&body)?;
    let photon = photons::create_photon(&st, spec).await?;
    Ok((StatusCode::CREATED, Json(photon)).into_response())
}

pub async fn delete_photon(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    photons::delete_photon(&st, &id).await?;
    Ok(deleted(&id))
}

// ---------------------------------------------------------------------------
// Deployments

pub async fn list_deployments(State(st): State<AppState>) -> Result<Response, ApiError> {
    Ok(Json(deployments::list_deployments(&st).await?).into_response())
}

pub async fn get_deployment(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(Json(deployments::get_deployment(&st, &id).await?).into_response())
}

pub async fn create_deployment(
    State(st): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let spec: DeploymentUserSpec = parse_json(&body)?;
    let deployment = deployments::create_deployment(&st, spec).await?;
    Ok((StatusCode::CREATED, Json(deployment)).into_response())
}

pub async fn patch_deployment(
    State(st): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Existence is checked before the body so a bad patch on a missing
    // deployment still reports 404.
    st.deployments.get(&id).await?;
    let patch: DeploymentPatch = parse_json(&body)?;
    let deployment = deployments::patch_deployment(&st, &id, patch).await?;
    Ok(Json(deployment).into_response())
}

pub async fn delete_deployment(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    deployments::delete_deployment(&st, &id).await?;
    Ok(deleted(&id))
}

pub async fn deployment_readiness(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(Json(diagnosis::readiness(&st, &id).await?).into_response())
}

pub async fn deployment_termination(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(Json(diagnosis::termination(&st, &id).await?).into_response())
}

// ---------------------------------------------------------------------------
// Secrets

pub async fn list_secrets(State(st): State<AppState>) -> Result<Response, ApiError> {
    Ok(Json(secrets::list_secret_names(&st).await?).into_response())
}

pub async fn upsert_secrets(State(st): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let list: Vec<Secret> = parse_json(&body)?;
    secrets::upsert_secrets(&st, list).await?;
    Ok(StatusCode::OK.into_response())
}

pub async fn delete_secret(
    State(st): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    secrets::delete_secret(&st, &name).await?;
    Ok(deleted(&name))
}

#[cfg(test)]
mod tests {
    use lepton_common::ResourceList;

    use super::*;
    use crate::state::testing::app_state;

    fn body(v: serde_json::Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&v).unwrap())
    }

    fn status_of(r: Result<Response, ApiError>) -> StatusCode {
        match r {
            Ok(resp) => resp.status(),
            Err(e) => e.into_response().status(),
        }
    }

    #[tokio::test]
    async fn deployment_lifecycle_through_handlers() {
        let st = app_state();

        let photon = body(json!({"name": "gpt2", "image": "lepton/runner:0.1"}));
        let resp = create_photon(State(st.clone()), photon).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let photon_id = st.photons.list().await.unwrap()[0].id.clone();

        let spec = body(json!({
            "name": "chat",
            "photon_id": photon_id,
            "resource_requirement": {
                "cpu": 0, "memory": 0, "resource_shape": "gp1.small", "min_replicas": 1
            }
        }));
        let created = create_deployment(State(st.clone()), spec).await;
        assert_eq!(status_of(created), StatusCode::CREATED);

        let patch = body(json!({"resource_requirement": {"min_replicas": 2}}));
        let patched = patch_deployment(State(st.clone()), Path("chat".to_string()), patch).await;
        assert_eq!(status_of(patched), StatusCode::OK);

        let readiness = deployment_readiness(State(st.clone()), Path("chat".to_string())).await;
        assert_eq!(status_of(readiness), StatusCode::OK);

        let gone = delete_deployment(State(st.clone()), Path("chat".to_string())).await;
        assert_eq!(status_of(gone), StatusCode::OK);
        let again = delete_deployment(State(st), Path("chat".to_string())).await;
        assert_eq!(status_of(again), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let st = app_state();
        let r = create_deployment(State(st.clone()), Bytes::from_static(b"{not json")).await;
        assert_eq!(status_of(r), StatusCode::BAD_REQUEST);

        let r = upsert_secrets(State(st.clone()), body(json!({"name": "a"}))).await;
        assert_eq!(status_of(r), StatusCode::BAD_REQUEST);

        let r = patch_deployment(State(st), Path("missing".to_string()), Bytes::new()).await;
        assert_eq!(status_of(r), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn workspace_info_hides_system_overhead() {
        let st = app_state();
        let Json(info) = workspace_info(State(st.clone())).await.unwrap();
        assert_eq!(info.name, "test");
        assert!(info.quota.is_none());

        let q = WorkspaceResourceQuota {
            name: "test".to_string(),
            hard: ResourceList::new(10.0, 20480, 1.0),
            used: ResourceList::new(3.0, 6144, 0.0),
        };
        st.quotas.create("test", &q).await.unwrap();
        let Json(info) = workspace_info(State(st)).await.unwrap();
        let quota = info.quota.unwrap();
        assert_eq!(quota.hard, ResourceList::new(8.0, 16384, 1.0));
        assert_eq!(quota.used, ResourceList::new(1.0, 2048, 0.0));
    }
}
