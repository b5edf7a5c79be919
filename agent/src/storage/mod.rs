//! Named cache buckets.
//!
//! Each generation owns a static and a dynamic bucket. Lookups search every
//! bucket in creation order, so entries from any surviving bucket are served.

pub mod disk;
pub mod memory;

use crate::errors::StorageError;
use crate::http::{CacheKey, Response};

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

/// Async storage for cache buckets.
///
/// Every operation is individually awaited by the caller. Operations on
/// different requests never wait on each other beyond what an
/// implementation needs for its own consistency.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Ids of all existing buckets, in creation order.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    async fn has(&self, cache_id: &str) -> Result<bool, StorageError>;

    /// Delete a bucket and all its entries. Returns `false` if it did not
    /// exist.
    async fn delete(&self, cache_id: &str) -> Result<bool, StorageError>;

    /// Look a request up in every bucket.
    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, StorageError>;

    /// Look a request up in one bucket.
    async fn match_in(&self, cache_id: &str, key: &CacheKey)
        -> Result<Option<Response>, StorageError>;

    /// Store one entry, creating the bucket if needed. Replaces an existing
    /// entry with the same key.
    async fn put(&self, cache_id: &str, key: CacheKey, response: Response)
        -> Result<(), StorageError>;

    /// Create-and-populate in one step: either every entry is stored or the
    /// storage is left unchanged.
    async fn put_all(
        &self,
        cache_id: &str,
        entries: Vec<(CacheKey, Response)>,
    ) -> Result<(), StorageError>;

    /// Version of the generation last activated against this storage.
    async fn active_version(&self) -> Result<Option<String>, StorageError>;

    async fn set_active_version(&self, version: &str) -> Result<(), StorageError>;
}
