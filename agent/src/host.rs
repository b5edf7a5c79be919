//! The agent's own execution context.
//!
//! [`AgentHost`] is a tokio task owning the [`Registration`]. Client code
//! talks to it only through an [`AgentHandle`], never sharing memory with
//! it. Lifecycle messages are processed one at a time in arrival order;
//! each fetch is handed to its own task so slow requests never block the
//! queue or each other. Installing a generation runs in its own task too;
//! only placing the installed generation goes back through the queue.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AgentConfig;
use crate::errors::{AgentError, FetchError};
use crate::http::{Request, Response};
use crate::lifecycle::{CacheAgent, LifecycleState};
use crate::network::{HttpNetwork, Network};
use crate::notify::{self, ClickOutcome, Notification, NotificationSink};
use crate::registration::{Registration, RegistrationStatus, ViewId};
use crate::storage::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};

/// Bound on queued messages before senders wait.
const CHANNEL_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum AgentMessage {
    Fetch {
        view: ViewId,
        request: Request,
        reply: Reply<Result<Response, FetchError>>,
    },
    Update {
        config: AgentConfig,
        reply: Reply<Result<LifecycleState, AgentError>>,
    },
    OpenView {
        reply: Reply<ViewId>,
    },
    CloseView {
        view: ViewId,
        reply: Reply<Result<bool, AgentError>>,
    },
    Push {
        payload: Option<String>,
        reply: Reply<Notification>,
    },
    NotificationClick {
        action: Option<String>,
        reply: Reply<ClickOutcome>,
    },
    Status {
        reply: Reply<RegistrationStatus>,
    },
}

/// A generation whose install task finished, on its way back to the host.
struct Installed {
    agent: CacheAgent,
    result: Result<(), AgentError>,
    reply: Reply<Result<LifecycleState, AgentError>>,
}

/// Cloneable sender side of a running agent host.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<AgentMessage>,
}

impl AgentHandle {
    async fn call<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> AgentMessage,
    ) -> Result<T, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| AgentError::HostClosed)?;
        rx.await.map_err(|_| AgentError::HostClosed)
    }

    /// Issue a request on behalf of a view.
    pub async fn fetch(&self, view: ViewId, request: Request) -> Result<Response, FetchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentMessage::Fetch {
                view,
                request,
                reply,
            })
            .await
            .map_err(|_| FetchError::HostClosed)?;
        rx.await.map_err(|_| FetchError::HostClosed)?
    }

    /// Register (install and possibly activate) a generation.
    pub async fn update(&self, config: AgentConfig) -> Result<LifecycleState, AgentError> {
        self.call(|reply| AgentMessage::Update { config, reply }).await?
    }

    pub async fn open_view(&self) -> Result<ViewId, AgentError> {
        self.call(|reply| AgentMessage::OpenView { reply }).await
    }

    pub async fn close_view(&self, view: ViewId) -> Result<bool, AgentError> {
        self.call(|reply| AgentMessage::CloseView { view, reply }).await?
    }

    /// Deliver a push message; returns the notification that was shown.
    pub async fn push(&self, payload: Option<String>) -> Result<Notification, AgentError> {
        self.call(|reply| AgentMessage::Push { payload, reply }).await
    }

    pub async fn notification_click(
        &self,
        action: Option<String>,
    ) -> Result<ClickOutcome, AgentError> {
        self.call(|reply| AgentMessage::NotificationClick { action, reply }).await
    }

    pub async fn status(&self) -> Result<RegistrationStatus, AgentError> {
        self.call(|reply| AgentMessage::Status { reply }).await
    }
}

/// Runs the registration in a background task.
pub struct AgentHost {
    registration: Registration,
    sink: Arc<dyn NotificationSink>,
    rx: mpsc::Receiver<AgentMessage>,
    installed_tx: mpsc::UnboundedSender<Installed>,
    installed_rx: mpsc::UnboundedReceiver<Installed>,
}

impl AgentHost {
    /// Spawn the host task. It stops when every handle is dropped.
    pub fn spawn(registration: Registration, sink: Arc<dyn NotificationSink>) -> AgentHandle {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (installed_tx, installed_rx) = mpsc::unbounded_channel();
        let host = Self {
            registration,
            sink,
            rx,
            installed_tx,
            installed_rx,
        };
        tokio::spawn(host.run());
        AgentHandle { tx }
    }

    /// Build the default stack for `origin` from `config` (HTTP network,
    /// disk storage when `cache_dir` is set, memory otherwise), spawn the
    /// host and register the configured generation.
    pub async fn start(
        origin: Url,
        config: AgentConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<AgentHandle, AgentError> {
        let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(&origin)?);
        Self::start_with(origin, config, network, sink).await
    }

    /// Like [`start`](Self::start), over a caller-supplied network.
    ///
    /// A generation recorded as active by an earlier run is adopted first,
    /// so cached assets are served even when the update below cannot reach
    /// the network. An install failure is logged and leaves the host running
    /// with whatever generation it had, possibly none.
    pub async fn start_with(
        origin: Url,
        config: AgentConfig,
        network: Arc<dyn Network>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<AgentHandle, AgentError> {
        let storage: Arc<dyn CacheStorage> = match &config.cache_dir {
            Some(dir) => Arc::new(DiskCacheStorage::open(dir).await?),
            None => Arc::new(MemoryCacheStorage::new()),
        };

        let mut registration = Registration::new(origin, network, storage);
        if let Err(e) = registration.restore(&config).await {
            warn!("Cached generation not restored: {}", e);
        }
        let handle = Self::spawn(registration, sink);
        if let Err(e) = handle.update(config).await {
            warn!("Caching agent not installed: {}", e);
        }
        Ok(handle)
    }

    async fn run(mut self) {
        info!("Agent host started for {}", self.registration.origin());
        loop {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(message) => self.dispatch(message).await,
                    None => break,
                },
                Some(installed) = self.installed_rx.recv() => self.place(installed).await,
            }
        }
        info!("Agent host stopped");
    }

    async fn place(&mut self, installed: Installed) {
        let Installed {
            agent,
            result,
            reply,
        } = installed;
        let result = match result {
            Ok(()) => self.registration.finish_update(agent).await,
            Err(e) => Err(e),
        };
        let _ = reply.send(result);
    }

    async fn dispatch(&mut self, message: AgentMessage) {
        match message {
            AgentMessage::Fetch {
                view,
                request,
                reply,
            } => {
                let controller = self.registration.controller_for(view);
                let network = self.registration.network();
                tokio::spawn(async move {
                    let result = match controller {
                        Some(agent) => agent.handle_fetch(request).await,
                        None => network.fetch(&request).await.map_err(FetchError::from),
                    };
                    let _ = reply.send(result);
                });
            }
            AgentMessage::Update { config, reply } => {
                let Some(mut agent) = self.registration.begin_update(config) else {
                    let _ = reply.send(Ok(LifecycleState::Active));
                    return;
                };
                let installed_tx = self.installed_tx.clone();
                tokio::spawn(async move {
                    let result = agent.install().await;
                    let _ = installed_tx.send(Installed {
                        agent,
                        result,
                        reply,
                    });
                });
            }
            AgentMessage::OpenView { reply } => {
                let view = self.registration.open_view();
                debug!("View {} opened", view);
                let _ = reply.send(view);
            }
            AgentMessage::CloseView { view, reply } => {
                debug!("View {} closed", view);
                let _ = reply.send(self.registration.close_view(view).await);
            }
            AgentMessage::Push { payload, reply } => {
                debug!("Push message received");
                let notification = notify::build_push_notification(payload.as_deref(), Utc::now());
                self.sink.show(&notification);
                let _ = reply.send(notification);
            }
            AgentMessage::NotificationClick { action, reply } => {
                debug!("Notification clicked: {:?}", action);
                self.sink.dismiss();
                let outcome = notify::handle_click(action.as_deref());
                if let ClickOutcome::OpenWindow(path) = &outcome {
                    self.sink.open_window(path);
                }
                let _ = reply.send(outcome);
            }
            AgentMessage::Status { reply } => {
                let _ = reply.send(self.registration.status());
            }
        }
    }
}
