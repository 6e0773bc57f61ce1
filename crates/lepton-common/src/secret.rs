use serde::{Deserialize, Serialize};

use crate::kind::Kind;

/// A workspace secret, referenced from deployment environment variables.
///
/// Stored under `/{namespace}/secrets/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub value: String,
}

impl Kind for Secret {
    const KIND: &'static str = "secrets";

    fn object_name(&self) -> &str {
        &self.name
    }
}
