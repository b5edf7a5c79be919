//! Integration tests for generation turnover through the agent host.
//!
//! A scripted in-process network stands in for the server so the tests can
//! serve different asset sets per generation, hold individual requests and
//! go offline at will.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use s3browser_agent::errors::{FetchError, NetworkError};
use s3browser_agent::http::{CacheKey, Method, Request, Response, ResponseType};
use s3browser_agent::network::Network;
use s3browser_agent::notify::LogNotificationSink;
use s3browser_agent::registration::Registration;
use s3browser_agent::storage::{CacheStorage, MemoryCacheStorage};
use s3browser_agent::{AgentConfig, AgentHandle, AgentHost, LifecycleState};
use tokio::sync::oneshot;
use url::Url;

// ── Scripted network ───────────────────────────────────────────────

struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (u16, &'static str)>>,
    offline: AtomicBool,
    hits: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl ScriptedNetwork {
    fn new() -> Arc<Self> {
        let routes = AgentConfig::default()
            .manifest
            .into_iter()
            .map(|p| (p, (200, "asset")))
            .collect();
        Arc::new(Self {
            routes: Mutex::new(routes),
            offline: AtomicBool::new(false),
            hits: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        })
    }

    fn serve(&self, path: &str, status: u16, body: &'static str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    /// Hold the next request for `path` until the returned sender fires.
    fn gate(&self, path: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(path.to_string(), rx);
        tx
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Offline);
        }
        let path = request.url.path().to_string();
        self.hits.lock().unwrap().push(path.clone());
        let gate = self.gates.lock().unwrap().remove(&path);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&path)
            .copied()
            .unwrap_or((404, "not found"));
        Ok(Response::new(status, ResponseType::Basic, body))
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn origin() -> Url {
    Url::parse("http://localhost:8080/").unwrap()
}

fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

fn spawn_host(network: Arc<ScriptedNetwork>, storage: Arc<dyn CacheStorage>) -> AgentHandle {
    AgentHost::spawn(
        Registration::new(origin(), network, storage),
        Arc::new(LogNotificationSink),
    )
}

async fn with_timeout<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("agent host did not answer in time")
}

async fn wait_for_hits(network: &ScriptedNetwork, path: &str, count: usize) {
    with_timeout(async {
        while network.hits(path) < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

fn disk_config(dir: &std::path::Path) -> AgentConfig {
    AgentConfig {
        cache_dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn upgrade_evicts_previous_generation() {
    let network = ScriptedNetwork::new();
    network.serve("/static/js/legacy.js", 200, "legacy");
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage.clone());

    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    // A v1-only asset written through into the v1 dynamic bucket.
    let legacy = Request::get(url("/static/js/legacy.js"));
    with_timeout(handle.fetch(view, legacy.clone())).await.unwrap();
    with_timeout(handle.fetch(view, legacy.clone())).await.unwrap();
    assert_eq!(network.hits("/static/js/legacy.js"), 1);

    let state = with_timeout(handle.update(AgentConfig::default().with_version("v2")))
        .await
        .unwrap();
    assert_eq!(state, LifecycleState::Active);

    let mut keys = storage.keys().await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["s3-static-v2"]);
    assert!(keys.iter().all(|k| !k.ends_with("-v1")));

    // The v1-only asset now goes to the network...
    with_timeout(handle.fetch(view, legacy.clone())).await.unwrap();
    assert_eq!(network.hits("/static/js/legacy.js"), 2);

    // ...and fails when offline; it is not served from a stale bucket.
    storage.delete("s3-dynamic-v2").await.unwrap();
    network.set_offline(true);
    let err = with_timeout(handle.fetch(view, legacy)).await.unwrap_err();
    assert_eq!(err, FetchError::Network(NetworkError::Offline));
}

#[tokio::test]
async fn api_listing_never_served_from_cache() {
    let network = ScriptedNetwork::new();
    network.serve("/api/list", 200, r#"{"path":"/","files":[],"has_more":false}"#);
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage.clone());
    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    let list = url("/api/list?path=%2F");
    storage
        .put(
            "s3-dynamic-v1",
            CacheKey::new(Method::Get, &list),
            Response::new(200, ResponseType::Basic, "cached listing"),
        )
        .await
        .unwrap();

    for _ in 0..3 {
        let resp = with_timeout(handle.fetch(view, Request::get(list.clone())))
            .await
            .unwrap();
        assert_ne!(resp.body, b"cached listing");
    }
    assert_eq!(network.hits("/api/list"), 3);

    network.set_offline(true);
    assert!(with_timeout(handle.fetch(view, Request::get(list)))
        .await
        .is_err());
}

#[tokio::test]
async fn failed_upgrade_keeps_serving_previous_generation() {
    let network = ScriptedNetwork::new();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage.clone());
    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    network.serve("/static/manifest.json", 500, "boom");
    let err = with_timeout(handle.update(AgentConfig::default().with_version("v2")))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("/static/manifest.json"));

    let status = with_timeout(handle.status()).await.unwrap();
    assert_eq!(status.active.as_deref(), Some("v1"));
    assert_eq!(storage.keys().await.unwrap(), vec!["s3-static-v1"]);

    network.set_offline(true);
    let resp = with_timeout(handle.fetch(view, Request::get(url("/static/css/style.css"))))
        .await
        .unwrap();
    assert_eq!(resp.body, b"asset");
}

#[tokio::test]
async fn offline_navigation_serves_home_document() {
    let network = ScriptedNetwork::new();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage);
    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    network.set_offline(true);
    let resp = with_timeout(handle.fetch(view, Request::navigate(url("/buckets/photos"))))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"asset");
}

#[tokio::test]
async fn concurrent_fetches_are_independent() {
    let network = ScriptedNetwork::new();
    for i in 0..16 {
        let path: &'static str = Box::leak(format!("/static/chunk-{i}.js").into_boxed_str());
        network.serve(path, 200, "chunk");
    }
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage.clone());
    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    let fetches = (0..16).map(|i| {
        let handle = handle.clone();
        async move {
            handle
                .fetch(view, Request::get(url(&format!("/static/chunk-{i}.js"))))
                .await
        }
    });
    let results = with_timeout(futures_util::future::join_all(fetches)).await;
    assert!(results.iter().all(|r| r.is_ok()));

    for i in 0..16 {
        let key = CacheKey::new(Method::Get, &url(&format!("/static/chunk-{i}.js")));
        assert!(storage.match_in("s3-dynamic-v1", &key).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn fetches_are_served_while_a_generation_installs() {
    let network = ScriptedNetwork::new();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage);
    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    // v2's install stalls on one manifest asset.
    let release = network.gate("/static/manifest.json");
    let upgrade = tokio::spawn({
        let handle = handle.clone();
        async move { handle.update(AgentConfig::default().with_version("v2")).await }
    });
    wait_for_hits(&network, "/static/manifest.json", 2).await;

    let resp = with_timeout(handle.fetch(view, Request::get(url("/static/css/style.css"))))
        .await
        .unwrap();
    assert_eq!(resp.body, b"asset");
    let status = with_timeout(handle.status()).await.unwrap();
    assert_eq!(status.active.as_deref(), Some("v1"));
    assert_eq!(status.controlled_views, 1);

    release.send(()).unwrap();
    let state = with_timeout(upgrade).await.unwrap().unwrap();
    assert_eq!(state, LifecycleState::Active);
    let status = with_timeout(handle.status()).await.unwrap();
    assert_eq!(status.active.as_deref(), Some("v2"));
}

#[tokio::test]
async fn superseded_generation_does_not_recreate_its_buckets() {
    let network = ScriptedNetwork::new();
    network.serve("/static/js/late.js", 200, "late");
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
    let handle = spawn_host(network.clone(), storage.clone());
    with_timeout(handle.update(AgentConfig::default())).await.unwrap();
    let view = with_timeout(handle.open_view()).await.unwrap();

    // A v1 miss still on the wire when v2 takes over.
    let release = network.gate("/static/js/late.js");
    let late = tokio::spawn({
        let handle = handle.clone();
        async move { handle.fetch(view, Request::get(url("/static/js/late.js"))).await }
    });
    wait_for_hits(&network, "/static/js/late.js", 1).await;

    with_timeout(handle.update(AgentConfig::default().with_version("v2")))
        .await
        .unwrap();
    assert_eq!(storage.keys().await.unwrap(), vec!["s3-static-v2"]);

    release.send(()).unwrap();
    let resp = with_timeout(late).await.unwrap().unwrap();
    assert_eq!(resp.body, b"late");
    assert_eq!(storage.keys().await.unwrap(), vec!["s3-static-v2"]);
}

#[tokio::test]
async fn offline_restart_serves_from_disk_cache() {
    let dir = tempfile::tempdir().unwrap();
    let network = ScriptedNetwork::new();

    {
        let handle = with_timeout(AgentHost::start_with(
            origin(),
            disk_config(dir.path()),
            network.clone(),
            Arc::new(LogNotificationSink),
        ))
        .await
        .unwrap();
        let status = with_timeout(handle.status()).await.unwrap();
        assert_eq!(status.active.as_deref(), Some("v1"));
    }

    network.set_offline(true);
    let handle = with_timeout(AgentHost::start_with(
        origin(),
        disk_config(dir.path()),
        network.clone(),
        Arc::new(LogNotificationSink),
    ))
    .await
    .unwrap();

    let status = with_timeout(handle.status()).await.unwrap();
    assert_eq!(status.active.as_deref(), Some("v1"));
    let view = with_timeout(handle.open_view()).await.unwrap();

    let resp = with_timeout(handle.fetch(view, Request::get(url("/static/css/style.css"))))
        .await
        .unwrap();
    assert_eq!(resp.body, b"asset");
    let resp = with_timeout(handle.fetch(view, Request::navigate(url("/buckets/photos"))))
        .await
        .unwrap();
    assert_eq!(resp.body, b"asset");
}

#[tokio::test]
async fn offline_restart_with_newer_build_keeps_recorded_generation() {
    let dir = tempfile::tempdir().unwrap();
    let network = ScriptedNetwork::new();
    {
        with_timeout(AgentHost::start_with(
            origin(),
            disk_config(dir.path()),
            network.clone(),
            Arc::new(LogNotificationSink),
        ))
        .await
        .unwrap();
    }

    network.set_offline(true);
    let handle = with_timeout(AgentHost::start_with(
        origin(),
        disk_config(dir.path()).with_version("v2"),
        network.clone(),
        Arc::new(LogNotificationSink),
    ))
    .await
    .unwrap();

    let status = with_timeout(handle.status()).await.unwrap();
    assert_eq!(status.active.as_deref(), Some("v1"));
    let view = with_timeout(handle.open_view()).await.unwrap();
    let resp = with_timeout(handle.fetch(view, Request::get(url("/static/js/app.js"))))
        .await
        .unwrap();
    assert_eq!(resp.body, b"asset");
}
