//! One cache generation and its lifecycle.
//!
//! ```text
//! Installing ──ok──▶ Waiting ──▶ Activating ──▶ Active ──superseded──▶ Redundant
//!     │
//!     └──any manifest fetch or store fails──▶ Redundant
//! ```
//!
//! Install and activate take `&mut self` and are driven serially by the
//! [`Registration`](crate::registration::Registration). Fetch handling takes
//! `&self` so any number of intercepted requests can be in flight at once,
//! each scoped to its own request/response pair.
//!
//! Once shared, a generation can only be retired through [`CacheAgent::retire`].
//! A retired generation finishes its in-flight fetches but stores nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{AgentConfig, CacheGeneration};
use crate::errors::{AgentError, FetchError};
use crate::http::{CacheKey, Method, Request, Response};
use crate::network::Network;
use crate::policy::{FetchDecision, FetchPolicy};
use crate::storage::CacheStorage;

/// Lifecycle state of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    /// Failed to install, or superseded by a newer generation. Never
    /// writes to storage again.
    Redundant,
}

/// A versioned caching agent.
pub struct CacheAgent {
    config: AgentConfig,
    generation: CacheGeneration,
    origin: Url,
    policy: FetchPolicy,
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    state: LifecycleState,
    retired: AtomicBool,
}

impl CacheAgent {
    pub fn new(
        config: AgentConfig,
        origin: Url,
        network: Arc<dyn Network>,
        storage: Arc<dyn CacheStorage>,
    ) -> Self {
        let generation = config.generation();
        let policy = FetchPolicy::new(&origin, &config.api_prefix);
        Self {
            config,
            generation,
            origin,
            policy,
            network,
            storage,
            state: LifecycleState::Installing,
            retired: AtomicBool::new(false),
        }
    }

    /// Adopt a generation installed by an earlier run, without fetching
    /// anything. Fails unless its static bucket holds the whole manifest.
    pub async fn restore(
        config: AgentConfig,
        origin: Url,
        network: Arc<dyn Network>,
        storage: Arc<dyn CacheStorage>,
    ) -> Result<Self, AgentError> {
        let mut agent = Self::new(config, origin, network, storage);
        for path in &agent.config.manifest {
            let key = CacheKey::new(Method::Get, &agent.asset_url(path)?);
            let found = agent
                .storage
                .match_in(&agent.generation.static_cache_id, &key)
                .await?;
            if found.is_none() {
                return Err(AgentError::Install {
                    path: path.clone(),
                    reason: format!("missing from {}", agent.generation.static_cache_id),
                });
            }
        }
        agent.state = LifecycleState::Active;
        info!("Restored cache generation {}", agent.generation.version);
        Ok(agent)
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_retired() {
            LifecycleState::Redundant
        } else {
            self.state
        }
    }

    /// Mark a shared generation as superseded.
    pub fn retire(&self) {
        if !self.retired.swap(true, Ordering::SeqCst) {
            info!("Generation {} is now redundant", self.generation.version);
        }
    }

    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> &CacheGeneration {
        &self.generation
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn expect_state(&self, expected: LifecycleState) -> Result<(), AgentError> {
        if self.state != expected {
            return Err(AgentError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn asset_url(&self, path: &str) -> Result<Url, AgentError> {
        self.origin.join(path).map_err(|e| AgentError::Install {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Fetch the whole manifest and store it in the static bucket.
    ///
    /// All-or-nothing: the bucket is only written once every asset has been
    /// fetched with a success status, and it is written in one `put_all`.
    /// On failure the generation becomes [`LifecycleState::Redundant`].
    pub async fn install(&mut self) -> Result<(), AgentError> {
        self.expect_state(LifecycleState::Installing)?;
        info!("Installing cache generation {}", self.generation.version);

        match self.populate_static_cache().await {
            Ok(count) => {
                info!(
                    "Installed {} assets into {}",
                    count, self.generation.static_cache_id
                );
                self.state = LifecycleState::Waiting;
                Ok(())
            }
            Err(e) => {
                error!(
                    "Installation of generation {} failed: {}",
                    self.generation.version, e
                );
                self.state = LifecycleState::Redundant;
                Err(e)
            }
        }
    }

    async fn populate_static_cache(&self) -> Result<usize, AgentError> {
        let fetches = self.config.manifest.iter().map(|path| async move {
            let request = Request::get(self.asset_url(path)?);
            let response = self.network.fetch(&request).await.map_err(|e| {
                AgentError::Install {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            if !response.is_ok() {
                return Err(AgentError::Install {
                    path: path.clone(),
                    reason: format!("HTTP {}", response.status),
                });
            }
            debug!("Fetched manifest asset {}", path);
            Ok::<_, AgentError>((request.cache_key(), response))
        });
        let entries = try_join_all(fetches).await?;
        let count = entries.len();

        self.storage
            .put_all(&self.generation.static_cache_id, entries)
            .await
            .map_err(|e| AgentError::Install {
                path: self.generation.static_cache_id.clone(),
                reason: e.to_string(),
            })?;
        Ok(count)
    }

    /// Evict every bucket not owned by this generation and become active.
    ///
    /// Returns the evicted bucket ids. A bucket that fails to delete is
    /// logged and left for the next activation; it does not block this one.
    pub async fn activate(&mut self) -> Result<Vec<String>, AgentError> {
        self.expect_state(LifecycleState::Waiting)?;
        self.state = LifecycleState::Activating;
        info!("Activating cache generation {}", self.generation.version);

        let mut evicted = Vec::new();
        match self.storage.keys().await {
            Ok(keys) => {
                for cache_id in keys.into_iter().filter(|id| !self.generation.owns(id)) {
                    match self.storage.delete(&cache_id).await {
                        Ok(_) => {
                            info!("Deleted old cache {}", cache_id);
                            evicted.push(cache_id);
                        }
                        Err(e) => warn!("Failed to delete old cache {}: {}", cache_id, e),
                    }
                }
            }
            Err(e) => warn!("Failed to enumerate caches during activation: {}", e),
        }

        self.state = LifecycleState::Active;
        info!("Cache generation {} active", self.generation.version);
        Ok(evicted)
    }

    /// Handle one intercepted request.
    ///
    /// A generation that is not active does not intercept: the request goes
    /// to the network as is.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response, FetchError> {
        if self.state != LifecycleState::Active {
            return Ok(self.network.fetch(&request).await?);
        }
        match self.policy.classify(&request) {
            FetchDecision::Passthrough => Ok(self.network.fetch(&request).await?),
            FetchDecision::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn cache_first(&self, request: Request) -> Result<Response, FetchError> {
        let key = request.cache_key();
        match self.storage.match_any(&key).await {
            Ok(Some(cached)) => {
                debug!("Serving from cache: {}", key);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup for {} failed: {}", key, e),
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if self.policy.should_store(&request, &response) {
                    self.write_through(key, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", key, e);
                if request.is_navigation() && self.config.navigation_fallback {
                    if let Some(home) = self.cached_home_document().await {
                        debug!("Serving cached home document for {}", key);
                        return Ok(home);
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Best-effort: storage failures are logged and swallowed.
    ///
    /// A retired generation stores nothing. A put that raced with retirement
    /// may have recreated the bucket after the successor evicted it, so the
    /// flag is checked again afterwards and the bucket dropped.
    async fn write_through(&self, key: CacheKey, response: &Response) {
        if self.is_retired() {
            debug!("Not caching {}: generation retired", key);
            return;
        }
        let cache_id = &self.generation.dynamic_cache_id;
        match self.storage.put(cache_id, key.clone(), response.clone()).await {
            Ok(()) => debug!("Cached {} in {}", key, cache_id),
            Err(e) => warn!("Failed to cache {} in {}: {}", key, cache_id, e),
        }
        if self.is_retired() {
            if let Err(e) = self.storage.delete(cache_id).await {
                warn!("Failed to drop retired cache {}: {}", cache_id, e);
            }
        }
    }

    async fn cached_home_document(&self) -> Option<Response> {
        let url = self.origin.join(&self.config.home_document).ok()?;
        match self.storage.match_any(&CacheKey::new(Method::Get, &url)).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Home document lookup failed: {}", e);
                None
            }
        }
    }
}
