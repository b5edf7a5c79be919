//! Disk-backed buckets.
//!
//! Layout under the cache directory:
//! - `index.json`: bucket ids in creation order, plus the active version
//! - `<cache_id>.json`: the bucket's entries, bodies base64-encoded
//!
//! Files are replaced through a temp file and a rename, so readers never see
//! a half-written bucket. Writers are serialized by a single lock.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::CacheStorage;
use crate::errors::StorageError;
use crate::http::{CacheKey, Response, ResponseType};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    caches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BucketFile {
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    key: CacheKey,
    status: u16,
    response_type: ResponseType,
    headers: Vec<(String, String)>,
    /// Base64 body.
    body: String,
}

impl StoredEntry {
    fn encode(key: CacheKey, response: Response) -> Self {
        Self {
            key,
            status: response.status,
            response_type: response.response_type,
            headers: response.headers,
            body: STANDARD.encode(&response.body),
        }
    }

    fn decode(&self, cache_id: &str) -> Result<Response, StorageError> {
        let body = STANDARD
            .decode(&self.body)
            .map_err(|e| StorageError::Corrupt {
                cache: cache_id.to_string(),
                reason: format!("{}: {e}", self.key),
            })?;
        Ok(Response {
            status: self.status,
            response_type: self.response_type,
            headers: self.headers.clone(),
            body,
        })
    }
}

impl BucketFile {
    fn upsert(&mut self, entry: StoredEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

/// Buckets persisted as JSON files in a directory.
pub struct DiskCacheStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskCacheStorage {
    /// Open (and create if needed) a cache directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Using cache directory {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bucket_path(&self, cache_id: &str) -> Result<PathBuf, StorageError> {
        let valid = !cache_id.is_empty()
            && cache_id != INDEX_FILE.trim_end_matches(".json")
            && cache_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !cache_id.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidCacheId(cache_id.to_string()));
        }
        Ok(self.dir.join(format!("{cache_id}.json")))
    }

    async fn read_index(&self) -> Result<IndexFile, StorageError> {
        read_json_or_default(&self.dir.join(INDEX_FILE)).await
    }

    async fn read_bucket(&self, cache_id: &str) -> Result<Option<BucketFile>, StorageError> {
        let path = self.bucket_path(cache_id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a bucket, registering it in the index if new. Caller holds the
    /// write lock.
    async fn write_bucket(&self, cache_id: &str, bucket: &BucketFile) -> Result<(), StorageError> {
        let path = self.bucket_path(cache_id)?;
        write_json_atomic(&path, bucket).await?;

        let mut index = self.read_index().await?;
        if !index.caches.iter().any(|id| id == cache_id) {
            index.caches.push(cache_id.to_string());
            write_json_atomic(&self.dir.join(INDEX_FILE), &index).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.read_index().await?.caches)
    }

    async fn has(&self, cache_id: &str) -> Result<bool, StorageError> {
        Ok(self.keys().await?.iter().any(|id| id == cache_id))
    }

    async fn delete(&self, cache_id: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.read_index().await?;
        let before = index.caches.len();
        index.caches.retain(|id| id != cache_id);
        if index.caches.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.dir.join(INDEX_FILE), &index).await?;

        let path = self.bucket_path(cache_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }

    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, StorageError> {
        for cache_id in self.keys().await? {
            if let Some(response) = self.match_in(&cache_id, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn match_in(
        &self,
        cache_id: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, StorageError> {
        let Some(bucket) = self.read_bucket(cache_id).await? else {
            return Ok(None);
        };
        bucket
            .entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.decode(cache_id))
            .transpose()
    }

    async fn put(
        &self,
        cache_id: &str,
        key: CacheKey,
        response: Response,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut bucket = self.read_bucket(cache_id).await?.unwrap_or_default();
        bucket.upsert(StoredEntry::encode(key, response));
        self.write_bucket(cache_id, &bucket).await
    }

    async fn put_all(
        &self,
        cache_id: &str,
        entries: Vec<(CacheKey, Response)>,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut bucket = self.read_bucket(cache_id).await?.unwrap_or_default();
        for (key, response) in entries {
            bucket.upsert(StoredEntry::encode(key, response));
        }
        // One rename publishes every entry at once.
        self.write_bucket(cache_id, &bucket).await
    }

    async fn active_version(&self) -> Result<Option<String>, StorageError> {
        Ok(self.read_index().await?.active)
    }

    async fn set_active_version(&self, version: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.read_index().await?;
        index.active = Some(version.to_string());
        write_json_atomic(&self.dir.join(INDEX_FILE), &index).await
    }
}

async fn read_json_or_default<T>(path: &Path) -> Result<T, StorageError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match tokio::fs::read(path).await {
        Ok(data) => Ok(serde_json::from_slice(&data)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use url::Url;

    fn key(path: &str) -> CacheKey {
        let url = Url::parse("http://localhost:8080/").unwrap().join(path).unwrap();
        CacheKey::new(Method::Get, &url)
    }

    fn resp(body: &[u8]) -> Response {
        Response::new(200, ResponseType::Basic, body.to_vec())
            .with_header("Content-Type", "text/css")
    }

    #[tokio::test]
    async fn put_all_then_match_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
            storage
                .put_all(
                    "s3-static-v1",
                    vec![(key("/"), resp(b"<html>")), (key("/s.css"), resp(&[0, 159, 255]))],
                )
                .await
                .unwrap();
        }

        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["s3-static-v1"]);
        let hit = storage.match_any(&key("/s.css")).await.unwrap().unwrap();
        assert_eq!(hit.body, vec![0, 159, 255]);
        assert_eq!(hit.header("content-type"), Some("text/css"));
        assert_eq!(hit.response_type, ResponseType::Basic);
    }

    #[tokio::test]
    async fn keys_keep_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        storage.put("s3-static-v2", key("/"), resp(b"2")).await.unwrap();
        storage.put("s3-dynamic-v2", key("/x"), resp(b"x")).await.unwrap();
        storage.put("s3-static-v2", key("/y"), resp(b"y")).await.unwrap();

        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["s3-static-v2", "s3-dynamic-v2"]
        );
    }

    #[tokio::test]
    async fn delete_removes_file_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        storage.put("s3-dynamic-v1", key("/x"), resp(b"x")).await.unwrap();
        assert!(dir.path().join("s3-dynamic-v1.json").exists());

        assert!(storage.delete("s3-dynamic-v1").await.unwrap());
        assert!(!dir.path().join("s3-dynamic-v1.json").exists());
        assert!(!storage.has("s3-dynamic-v1").await.unwrap());
        assert!(!storage.delete("s3-dynamic-v1").await.unwrap());
        assert!(storage.match_any(&key("/x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn active_version_survives_reopen_and_bucket_churn() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
            assert_eq!(storage.active_version().await.unwrap(), None);
            storage.put("s3-static-v1", key("/"), resp(b"1")).await.unwrap();
            storage.set_active_version("v1").await.unwrap();
            storage.put("s3-dynamic-v1", key("/x"), resp(b"x")).await.unwrap();
            storage.delete("s3-dynamic-v1").await.unwrap();
        }

        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        assert_eq!(storage.active_version().await.unwrap().as_deref(), Some("v1"));
        assert_eq!(storage.keys().await.unwrap(), vec!["s3-static-v1"]);
    }

    #[tokio::test]
    async fn index_without_active_version_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), r#"{"caches":["c"]}"#).unwrap();
        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["c"]);
        assert_eq!(storage.active_version().await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_replaces_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        storage.put("c", key("/x"), resp(b"1")).await.unwrap();
        storage.put("c", key("/x"), resp(b"2")).await.unwrap();
        let hit = storage.match_in("c", &key("/x")).await.unwrap().unwrap();
        assert_eq!(hit.body, b"2");
    }

    #[tokio::test]
    async fn rejects_path_like_cache_ids() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        for bad in ["../escape", "a/b", "", "index", ".hidden"] {
            let err = storage.put(bad, key("/x"), resp(b"x")).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidCacheId(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn corrupt_body_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open(dir.path()).await.unwrap();
        storage.put("c", key("/x"), resp(b"ok")).await.unwrap();

        let path = dir.path().join("c.json");
        let mut bucket: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        bucket["entries"][0]["body"] = serde_json::Value::String("!!not base64!!".into());
        std::fs::write(&path, serde_json::to_vec(&bucket).unwrap()).unwrap();

        let err = storage.match_in("c", &key("/x")).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
