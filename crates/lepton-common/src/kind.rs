use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity kind that can be persisted by the generic object store.
///
/// `KIND` is the plural lowercase kind name used in storage keys and
/// backup blob names (e.g. `deployments`).
pub trait Kind: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: &'static str;

    /// Name the object is stored under within its namespace.
    fn object_name(&self) -> &str;
}
