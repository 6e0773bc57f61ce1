use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::kind::Kind;
use crate::names::validate_env_name;
use crate::resources::ResourceRequirement;

/// Lifecycle state of a deployment. The control plane sets `Starting` and
/// `Updating`; the deployment operator drives the rest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    #[default]
    Starting,
    Updating,
    Running,
    NotReady,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRef {
    pub secret_name_ref: String,
}

/// An environment variable: a literal value or a secret reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<SecretRef>,
}

impl EnvVar {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_env_name(&self.name)?;
        if self.value.is_some() == self.value_from.is_some() {
            return Err(ValidationError::InvalidEnvVar {
                name: self.name.clone(),
                reason: "exactly one of value or value_from must be set".to_string(),
            });
        }
        Ok(())
    }

    pub fn secret_ref(&self) -> Option<&str> {
        self.value_from.as_ref().map(|r| r.secret_name_ref.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenValue {
    pub token_name_ref: String,
}

/// A bearer token accepted by the deployment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenVar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<TokenValue>,
}

/// A path of the workspace file system mounted into every replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mount {
    pub path: String,
    pub mount_path: String,
}

impl Mount {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.path.starts_with('/') || !self.mount_path.starts_with('/') {
            return Err(ValidationError::InvalidMount(format!(
                "path '{}' and mount_path '{}' must be absolute",
                self.path, self.mount_path
            )));
        }
        Ok(())
    }
}

/// The user-writable part of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentUserSpec {
    pub name: String,
    pub photon_id: String,
    pub resource_requirement: ResourceRequirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_tokens: Option<Vec<TokenVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envs: Option<Vec<EnvVar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mounts: Option<Vec<Mount>>,
}

/// Fields derived by the control plane at admission time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentSystemSpec {
    /// Photon image rewritten to the workspace registry.
    pub image: String,
    /// Spec-name of the referenced photon.
    pub photon_name: String,
    pub bucket_path: String,
    pub efs_path: String,
    pub root_domain: String,
    pub workspace_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub certificate_arn: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentEndpoint {
    #[serde(default)]
    pub internal_endpoint: String,
    #[serde(default)]
    pub external_endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub state: DeploymentState,
    #[serde(default)]
    pub endpoint: DeploymentEndpoint,
}

/// A declared running service, watched by the deployment operator.
///
/// Stored under `/{namespace}/deployments/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    /// Derived from `spec.name`, see [`crate::names::deployment_id`].
    pub id: String,

    pub spec: DeploymentUserSpec,

    #[serde(default)]
    pub system: DeploymentSystemSpec,

    #[serde(default)]
    pub status: DeploymentStatus,

    /// Creation timestamp (ms since epoch).
    #[serde(default)]
    pub created_at_ms: u64,

    /// Last update timestamp (ms since epoch).
    #[serde(default)]
    pub updated_at_ms: u64,
}

impl Kind for Deployment {
    const KIND: &'static str = "deployments";

    fn object_name(&self) -> &str {
        &self.id
    }
}

/// Partial update of a deployment's user spec.
///
/// Empty strings, zero replicas and absent lists mean "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeploymentPatch {
    #[serde(default)]
    pub photon_id: String,
    /// Overrides the image derived from the photon. Lands in the system
    /// spec, so `apply_to` does not see it.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub resource_requirement: Option<ResourceRequirementPatch>,
    #[serde(default)]
    pub api_tokens: Option<Vec<TokenVar>>,
    #[serde(default)]
    pub envs: Option<Vec<EnvVar>>,
    #[serde(default)]
    pub mounts: Option<Vec<Mount>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceRequirementPatch {
    #[serde(default)]
    pub min_replicas: u32,
    #[serde(default)]
    pub resource_shape: String,
}

impl DeploymentPatch {
    pub fn new_photon_id(&self) -> Option<&str> {
        Some(self.photon_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn new_image(&self) -> Option<&str> {
        Some(self.image.as_str()).filter(|image| !image.is_empty())
    }

    /// Applies the patch to `spec` and returns whether any field changed.
    ///
    /// Setting a shape clears raw CPU/memory/accelerator values so the
    /// requirement stays exclusive.
    pub fn apply_to(&self, spec: &mut DeploymentUserSpec) -> bool {
        let mut patched = false;

        if let Some(id) = self.new_photon_id() {
            spec.photon_id = id.to_string();
            patched = true;
        }
        if let Some(rr) = &self.resource_requirement {
            if rr.min_replicas > 0 {
                spec.resource_requirement.min_replicas = Some(rr.min_replicas);
                patched = true;
            }
            if !rr.resource_shape.is_empty() {
                let req = &mut spec.resource_requirement;
                req.resource_shape = rr.resource_shape.clone();
                req.cpu = 0.0;
                req.memory = 0;
                req.accelerator_type.clear();
                req.accelerator_num = 0.0;
                patched = true;
            }
        }
        if let Some(tokens) = &self.api_tokens {
            spec.api_tokens = Some(tokens.clone());
            patched = true;
        }
        if let Some(envs) = &self.envs {
            spec.envs = Some(envs.clone());
            patched = true;
        }
        if let Some(mounts) = &self.mounts {
            spec.mounts = Some(mounts.clone());
            patched = true;
        }

        patched
    }
}
