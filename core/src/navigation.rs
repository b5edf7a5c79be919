//! Fetch-on-navigate controller.
//!
//! `navigate` calls are not mutually exclusive: a second call may start
//! before the first settles. Each call takes a token from a monotonically
//! increasing counter while holding the state lock; when a listing arrives,
//! it is applied only if its token is still the latest one. Older
//! completions are dropped without touching the state.
//!
//! There is no timeout. A listing request that never settles leaves the
//! loading marker set.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::errors::{ErrorInfo, NavigationError};
use crate::files::browser::ListingSource;
use crate::path;
use crate::state::DirectoryState;

/// How a single `navigate` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The listing was applied to the state.
    Loaded,
    /// The request failed; the error was recorded in the state.
    Failed(NavigationError),
    /// A newer navigation started before this one resolved. Nothing changed.
    Superseded,
}

/// Owns the [`DirectoryState`] and drives it from a [`ListingSource`].
pub struct NavigationController<S: ListingSource> {
    source: S,
    state: Mutex<DirectoryState>,
    latest: AtomicU64,
    updates: watch::Sender<DirectoryState>,
}

impl<S: ListingSource> NavigationController<S> {
    pub fn new(source: S) -> Self {
        let (updates, _) = watch::channel(DirectoryState::default());
        Self {
            source,
            state: Mutex::new(DirectoryState::default()),
            latest: AtomicU64::new(0),
            updates,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Receive a snapshot after every applied state change.
    ///
    /// This is the render side channel; correctness never depends on it.
    pub fn subscribe(&self) -> watch::Receiver<DirectoryState> {
        self.updates.subscribe()
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> DirectoryState {
        self.state.lock().await.clone()
    }

    /// Navigate to `target`, issuing exactly one listing request.
    pub async fn navigate(&self, target: &str) -> NavigationOutcome {
        let requested = path::normalize(target);

        let token = {
            let mut state = self.state.lock().await;
            let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            state.begin_loading(&requested);
            self.publish(&state);
            token
        };

        debug!("Navigation #{} to {}", token, requested);
        let result = self.source.list(&requested).await;

        let mut state = self.state.lock().await;
        if self.latest.load(Ordering::SeqCst) != token {
            debug!("Discarding stale navigation #{} to {}", token, requested);
            return NavigationOutcome::Superseded;
        }

        let outcome = match result {
            Ok(listing) => {
                debug!("Loaded {} ({} entries)", listing.path, listing.files.len());
                state.apply_listing(listing);
                NavigationOutcome::Loaded
            }
            Err(e) => {
                warn!("Failed to list {}: {}", requested, e);
                state.apply_error(ErrorInfo::from(&e));
                NavigationOutcome::Failed(e)
            }
        };
        self.publish(&state);
        outcome
    }

    /// Navigate to the parent of the current path. At the root this reloads
    /// the root.
    pub async fn go_to_parent(&self) -> NavigationOutcome {
        let current = self.state.lock().await.current_path.clone();
        self.navigate(&path::parent(&current)).await
    }

    /// Reload the current path.
    pub async fn refresh(&self) -> NavigationOutcome {
        let current = self.state.lock().await.current_path.clone();
        self.navigate(&current).await
    }

    fn publish(&self, state: &DirectoryState) {
        self.updates.send_replace(state.clone());
    }
}
