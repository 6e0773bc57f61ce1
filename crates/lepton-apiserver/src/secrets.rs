use tracing::info;

use lepton_common::Secret;
use lepton_meta::StoreError;

use crate::error::ApiError;
use crate::state::AppState;

/// Secret names, never values.
pub async fn list_secret_names(st: &AppState) -> Result<Vec<String>, ApiError> {
    let mut names: Vec<String> = st.secrets.list().await?.into_iter().map(|s| s.name).collect();
    names.sort();
    Ok(names)
}

/// Creates or replaces each secret.
pub async fn upsert_secrets(st: &AppState, secrets: Vec<Secret>) -> Result<(), ApiError> {
    st.ensure_writable()?;

    for s in &secrets {
        if s.name.is_empty() || s.name.contains('/') {
            return Err(ApiError::Validation(format!("invalid secret name '{}'", s.name)));
        }
    }

    for s in &secrets {
        match st.secrets.get_versioned(&s.name).await {
            Ok(current) => {
                st.secrets.update_at(&s.name, s, current.revision).await?;
            }
            Err(StoreError::NotFound { .. }) => {
                st.secrets.create(&s.name, s).await?;
            }
            Err(e) => return Err(e.into()),
        }
        info!(name = %s.name, "secret stored");
    }
    Ok(())
}

/// Deletes a secret unless a deployment environment still refers to it.
pub async fn delete_secret(st: &AppState, name: &str) -> Result<(), ApiError> {
    st.ensure_writable()?;

    let deployments = st.deployments.list().await?;
    let user = deployments.iter().find(|d| {
        d.spec
            .envs
            .iter()
            .flatten()
            .any(|e| e.secret_ref() == Some(name))
    });
    if let Some(d) = user {
        return Err(ApiError::Conflict(format!(
            "secret {name} is used by deployment {}",
            d.id
        )));
    }

    st.secrets.delete(name).await?;
    info!(name = %name, "secret deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::app_state;

    fn secret(name: &str, value: &str) -> Secret {
        Secret {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_then_delete() {
        let st = app_state();
        upsert_secrets(&st, vec![secret("b", "1"), secret("a", "2")]).await.unwrap();
        upsert_secrets(&st, vec![secret("a", "3")]).await.unwrap();

        assert_eq!(list_secret_names(&st).await.unwrap(), vec!["a", "b"]);
        assert_eq!(st.secrets.get("a").await.unwrap().value, "3");

        delete_secret(&st, "a").await.unwrap();
        assert_eq!(list_secret_names(&st).await.unwrap(), vec!["b"]);
        assert!(matches!(delete_secret(&st, "a").await.unwrap_err(), ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_name_writes_nothing() {
        let st = app_state();
        let err = upsert_secrets(&st, vec![secret("ok", "1"), secret("", "2")])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(list_secret_names(&st).await.unwrap().is_empty());
    }
}
