use anyhow::Result;
use async_trait::async_trait;

/// A stored value with the revision of its last modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
    pub revision: u64,
}

/// Revisioned key/value API of the cluster. Every write is a single atomic
/// operation; absent keys have revision 0.
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<KeyValue>>;

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>>;

    /// Writes `value` if the key's current revision is `expected_revision`.
    /// Returns whether the write happened and the key's revision afterwards.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected_revision: u64,
        value: Vec<u8>,
    ) -> Result<(bool, u64)>;

    /// Removes the key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Writes `value` only if the key is absent. Returns the new revision,
    /// or `None` when the key already exists.
    async fn create(&self, key: &str, value: Vec<u8>) -> Result<Option<u64>> {
        let (ok, rev) = self.compare_and_swap(key, 0, value).await?;
        Ok(ok.then_some(rev))
    }
}
