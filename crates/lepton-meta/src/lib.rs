pub mod backup;
pub mod blob;
pub mod error;
pub mod etcd;
pub mod memory;
pub mod object_store;
pub mod types;

pub use backup::{backup_loop, backup_once, backup_until_success, sleep_or_cancel, BackupSchedule};
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::StoreError;
pub use etcd::EtcdMetaStore;
pub use memory::MemoryMetaStore;
pub use object_store::{ObjectStore, Snapshot, Versioned};
pub use types::{KeyValue, MetaStore};
