/// Rejection of a user-supplied spec before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid resource requirement: {0}")]
    InvalidResourceRequirement(String),

    #[error("unsupported resource shape '{0}'")]
    UnknownShape(String),

    #[error("invalid environment variable '{name}': {reason}")]
    InvalidEnvVar { name: String, reason: String },

    #[error("invalid mount: {0}")]
    InvalidMount(String),

    #[error("{0}")]
    Other(String),
}
