use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::kind::Kind;

/// User-supplied description of a photon, as uploaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotonSpec {
    /// Spec-name shared by every build of the same model (e.g. "llama2-chat").
    pub name: String,

    /// Model reference the photon was built from (e.g. "hf:meta-llama/Llama-2-7b-chat-hf").
    #[serde(default)]
    pub model: String,

    /// Container image the photon runs in.
    pub image: String,

    /// HTTP paths the photon exposes.
    #[serde(default)]
    pub exposed_paths: Vec<String>,

    /// Extra Python requirements installed at start.
    #[serde(default)]
    pub requirement_dependency: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,

    /// OpenAPI schema of the exposed paths, opaque to the control plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi_schema: Option<serde_json::Value>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// An immutable, content-addressed model artifact.
///
/// Stored under `/{namespace}/photons/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photon {
    /// `{name}-{hash}`, see [`photon_id`].
    pub id: String,

    #[serde(flatten)]
    pub spec: PhotonSpec,

    /// Creation timestamp (ms since epoch).
    #[serde(default)]
    pub created_at_ms: u64,
}

impl Kind for Photon {
    const KIND: &'static str = "photons";

    fn object_name(&self) -> &str {
        &self.id
    }
}

impl Photon {
    pub fn new(spec: PhotonSpec, created_at_ms: u64) -> Self {
        Self {
            id: photon_id(&spec),
            spec,
            created_at_ms,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Number of hex digits of the content hash kept in a photon ID.
const ID_HASH_LEN: usize = 8;

/// Content-addressed identity: spec-name plus a prefix of the SHA-256 of
/// the canonical JSON encoding of the spec. Re-uploading an identical spec
/// yields the same ID.
pub fn photon_id(spec: &PhotonSpec) -> String {
    // BTreeMap labels and declared field order keep the encoding stable.
    let canonical = serde_json::to_vec(spec).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(&canonical));
    format!("{}-{}", spec.name.to_ascii_lowercase(), &digest[..ID_HASH_LEN])
}
