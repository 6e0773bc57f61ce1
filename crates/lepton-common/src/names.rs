use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

/// Longest user-given name accepted for photons and deployments.
pub const MAX_NAME_LEN: usize = 32;

/// Environment variable prefix reserved for values injected by the platform.
pub const RESERVED_ENV_PREFIX: &str = "LEPTON_";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]([-a-zA-Z0-9]*[a-zA-Z0-9])?$").expect("static regex"));

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Checks a user-given photon or deployment name.
///
/// Format: starts with a letter, letters/digits/dashes, no trailing dash,
/// at most [`MAX_NAME_LEN`] chars.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            reason: format!("must be 1 to {MAX_NAME_LEN} characters long"),
        });
    }
    if !NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            reason: "must start with a letter and contain only letters, digits and dashes, \
                     not ending with a dash"
                .to_string(),
        });
    }
    Ok(())
}

/// Derives the storage name (ID) of a deployment from its user-given name.
///
/// Object names in the cluster are lowercase, so two user names that differ
/// only in case map to the same deployment.
pub fn deployment_id(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub fn validate_env_name(name: &str) -> Result<(), ValidationError> {
    if !ENV_NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidEnvVar {
            name: name.to_string(),
            reason: "must match [A-Za-z_][A-Za-z0-9_]*".to_string(),
        });
    }
    if name.starts_with(RESERVED_ENV_PREFIX) {
        return Err(ValidationError::InvalidEnvVar {
            name: name.to_string(),
            reason: format!("the {RESERVED_ENV_PREFIX} prefix is reserved"),
        });
    }
    Ok(())
}
