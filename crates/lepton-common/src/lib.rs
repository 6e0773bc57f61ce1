pub mod deployment;
pub mod error;
pub mod exit_code;
pub mod kind;
pub mod names;
pub mod photon;
pub mod pod;
pub mod quota;
pub mod readiness;
pub mod resources;
pub mod secret;
pub mod shape;
pub mod termination;
pub mod workspace;

pub use deployment::{
    Deployment, DeploymentEndpoint, DeploymentPatch, DeploymentState, DeploymentStatus,
    DeploymentSystemSpec, DeploymentUserSpec, EnvVar, Mount, ResourceRequirementPatch, SecretRef,
    TokenValue, TokenVar,
};
pub use error::ValidationError;
pub use exit_code::code_to_error;
pub use kind::Kind;
pub use photon::{Photon, PhotonSpec};
pub use pod::{ContainerStatus, Pod, PodCondition, PodEvent};
pub use quota::{admit, WorkspaceResourceQuota, SYSTEM_OVERHEAD};
pub use readiness::{diagnose_readiness, ReadinessReason, ReplicaReadinessIssue};
pub use resources::{ResourceList, ResourceRequirement};
pub use secret::Secret;
pub use shape::{lookup_shape, Shape, SUPPORTED_SHAPES};
pub use termination::{diagnose_terminations, ReplicaTermination};
pub use workspace::WorkspaceState;

pub mod telemetry;

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
