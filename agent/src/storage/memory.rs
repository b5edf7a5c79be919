use std::collections::HashMap;

use tokio::sync::RwLock;

use super::CacheStorage;
use crate::errors::StorageError;
use crate::http::{CacheKey, Response};

type Bucket = HashMap<CacheKey, Response>;

/// In-memory buckets, lost when the process exits.
///
/// Buckets live in a `Vec` to keep creation order for `keys` and
/// `match_any`.
#[derive(Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<Vec<(String, Bucket)>>,
    active: RwLock<Option<String>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn has(&self, cache_id: &str) -> Result<bool, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().any(|(id, _)| id == cache_id))
    }

    async fn delete(&self, cache_id: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|(id, _)| id != cache_id);
        Ok(buckets.len() != before)
    }

    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find_map(|(_, bucket)| bucket.get(key).cloned()))
    }

    async fn match_in(
        &self,
        cache_id: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|(id, _)| id == cache_id)
            .and_then(|(_, bucket)| bucket.get(key).cloned()))
    }

    async fn put(
        &self,
        cache_id: &str,
        key: CacheKey,
        response: Response,
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        match buckets.iter_mut().find(|(id, _)| id == cache_id) {
            Some((_, bucket)) => {
                bucket.insert(key, response);
            }
            None => {
                buckets.push((cache_id.to_string(), HashMap::from([(key, response)])));
            }
        }
        Ok(())
    }

    async fn put_all(
        &self,
        cache_id: &str,
        entries: Vec<(CacheKey, Response)>,
    ) -> Result<(), StorageError> {
        // Single write lock: readers see either none or all of the entries.
        let mut buckets = self.buckets.write().await;
        match buckets.iter_mut().find(|(id, _)| id == cache_id) {
            Some((_, bucket)) => bucket.extend(entries),
            None => buckets.push((cache_id.to_string(), entries.into_iter().collect())),
        }
        Ok(())
    }

    async fn active_version(&self) -> Result<Option<String>, StorageError> {
        Ok(self.active.read().await.clone())
    }

    async fn set_active_version(&self, version: &str) -> Result<(), StorageError> {
        *self.active.write().await = Some(version.to_string());
        Ok(())
    }
}
