use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// An optimistic update lost against a concurrent writer.
    #[error("{kind} '{name}' was modified concurrently, retry the request")]
    Conflict { kind: &'static str, name: String },

    #[error("failed to encode or decode {kind}: {source}")]
    Serialization {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op} on {kind} timed out after {timeout:?}")]
    Timeout {
        kind: &'static str,
        op: &'static str,
        timeout: Duration,
    },

    #[error("{kind} backend error: {message}")]
    Backend { kind: &'static str, message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
