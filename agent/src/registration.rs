//! Generation bookkeeping: which generation is active, which one waits, and
//! which views each one controls.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::lifecycle::{CacheAgent, LifecycleState};
use crate::network::Network;
use crate::storage::CacheStorage;

/// Identifies an open client view.
pub type ViewId = Uuid;

/// Snapshot of the registration for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub active: Option<String>,
    pub waiting: Option<String>,
    pub views: usize,
    pub controlled_views: usize,
}

/// Owns every generation of the agent for one origin.
///
/// The active generation is shared behind an `Arc` so in-flight fetches keep
/// the generation they started with even if a newer one is promoted. A
/// superseded generation is retired before its successor evicts anything.
pub struct Registration {
    origin: Url,
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    active: Option<Arc<CacheAgent>>,
    waiting: Option<CacheAgent>,
    /// View id → version of the generation controlling it.
    views: HashMap<ViewId, Option<String>>,
}

impl Registration {
    pub fn new(origin: Url, network: Arc<dyn Network>, storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            origin,
            network,
            storage,
            active: None,
            waiting: None,
            views: HashMap::new(),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn network(&self) -> Arc<dyn Network> {
        self.network.clone()
    }

    fn active_version(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.generation().version.as_str())
    }

    fn old_generation_in_use(&self) -> bool {
        let Some(active) = self.active_version() else {
            return false;
        };
        self.views
            .values()
            .any(|controller| controller.as_deref() == Some(active))
    }

    /// Install a generation built from `config`.
    ///
    /// Registering the version that is already active is a no-op. A failed
    /// install leaves the current active generation in place. Returns the
    /// state the new generation ended up in.
    pub async fn update(&mut self, config: AgentConfig) -> Result<LifecycleState, AgentError> {
        let Some(mut agent) = self.begin_update(config) else {
            return Ok(LifecycleState::Active);
        };
        agent.install().await?;
        self.finish_update(agent).await
    }

    /// A fresh generation for `config`, still to be installed. `None` when
    /// that version is already active.
    ///
    /// Installing needs no access to the registration, so the host runs it
    /// outside its message loop and hands the result to
    /// [`finish_update`](Self::finish_update).
    pub fn begin_update(&self, config: AgentConfig) -> Option<CacheAgent> {
        if self.active_version() == Some(config.version.as_str()) {
            debug!("Generation {} already active", config.version);
            return None;
        }
        Some(CacheAgent::new(
            config,
            self.origin.clone(),
            self.network.clone(),
            self.storage.clone(),
        ))
    }

    /// Place an installed generation: promote it, or park it as waiting
    /// while views of the old generation are open.
    pub async fn finish_update(&mut self, agent: CacheAgent) -> Result<LifecycleState, AgentError> {
        // Another update may have activated the same version meanwhile.
        if self.active_version() == Some(agent.generation().version.as_str()) {
            debug!("Generation {} already active", agent.generation().version);
            return Ok(LifecycleState::Active);
        }

        let skip_waiting = agent.config().skip_waiting;
        if self.active.is_none() || skip_waiting || !self.old_generation_in_use() {
            self.promote(agent).await?;
            return Ok(LifecycleState::Active);
        }

        if let Some(previous) = self.waiting.replace(agent) {
            info!(
                "Waiting generation {} replaced and is now redundant",
                previous.generation().version
            );
        }
        Ok(LifecycleState::Waiting)
    }

    /// Activate a generation and take control of every open view.
    async fn promote(&mut self, mut agent: CacheAgent) -> Result<Vec<String>, AgentError> {
        // The old generation stops storing before eviction starts.
        if let Some(previous) = &self.active {
            previous.retire();
        }
        let evicted = agent.activate().await?;
        let version = agent.generation().version.clone();

        if let Some(previous) = self.active.replace(Arc::new(agent)) {
            info!("Generation {} superseded by {}", previous.generation().version, version);
        }
        if let Err(e) = self.storage.set_active_version(&version).await {
            warn!("Failed to record active generation {}: {}", version, e);
        }
        self.claim_views(&version);
        Ok(evicted)
    }

    fn claim_views(&mut self, version: &str) {
        for controller in self.views.values_mut() {
            *controller = Some(version.to_string());
        }
        debug!("Generation {} claimed {} views", version, self.views.len());
    }

    /// Adopt the generation an earlier run recorded as active, without
    /// touching the network. Only valid before any generation is active.
    ///
    /// Returns the adopted version, or `None` when nothing was recorded.
    /// Fails when the recorded generation's static bucket is incomplete.
    pub async fn restore(&mut self, config: &AgentConfig) -> Result<Option<String>, AgentError> {
        if self.active.is_some() {
            return Ok(None);
        }
        let Some(version) = self.storage.active_version().await? else {
            return Ok(None);
        };
        let agent = CacheAgent::restore(
            config.clone().with_version(&version),
            self.origin.clone(),
            self.network.clone(),
            self.storage.clone(),
        )
        .await?;
        self.active = Some(Arc::new(agent));
        self.claim_views(&version);
        Ok(Some(version))
    }

    /// A new view loads under the active generation, if any.
    pub fn open_view(&mut self) -> ViewId {
        let id = Uuid::new_v4();
        let controller = self.active_version().map(str::to_string);
        self.views.insert(id, controller);
        id
    }

    /// Close a view. Promotes the waiting generation once the old one
    /// controls no view. Returns whether the view existed.
    pub async fn close_view(&mut self, view: ViewId) -> Result<bool, AgentError> {
        if self.views.remove(&view).is_none() {
            return Ok(false);
        }
        if !self.old_generation_in_use() {
            if let Some(waiting) = self.waiting.take() {
                self.promote(waiting).await?;
            }
        }
        Ok(true)
    }

    /// The generation that intercepts requests from `view`.
    ///
    /// Unknown and uncontrolled views have none: their requests go straight
    /// to the network.
    pub fn controller_for(&self, view: ViewId) -> Option<Arc<CacheAgent>> {
        let controller = self.views.get(&view)?.as_deref()?;
        self.active
            .as_ref()
            .filter(|a| a.generation().version == controller)
            .cloned()
    }

    pub fn status(&self) -> RegistrationStatus {
        let active = self.active_version().map(str::to_string);
        let controlled_views = self
            .views
            .values()
            .filter(|c| c.is_some() && c.as_deref() == active.as_deref())
            .count();
        RegistrationStatus {
            active,
            waiting: self.waiting.as_ref().map(|w| w.generation().version.clone()),
            views: self.views.len(),
            controlled_views,
        }
    }
}
