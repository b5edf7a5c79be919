//! The directory state owned by the navigation controller.

use serde::{Deserialize, Serialize};

use crate::errors::ErrorInfo;
use crate::files::DirectoryListing;
use crate::path;

/// What the client currently shows.
///
/// Only [`NavigationController`](crate::navigation::NavigationController)
/// mutates this; everyone else sees snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryState {
    pub current_path: String,
    pub listing: Option<DirectoryListing>,
    pub last_error: Option<ErrorInfo>,
    /// Loading marker: the path of the authoritative in-flight navigation.
    pub loading: Option<String>,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            current_path: path::ROOT.to_string(),
            listing: None,
            last_error: None,
            loading: None,
        }
    }
}

impl DirectoryState {
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub(crate) fn begin_loading(&mut self, requested: &str) {
        self.loading = Some(requested.to_string());
    }

    /// Apply a successful listing. The server-reported path wins over the
    /// requested one.
    pub(crate) fn apply_listing(&mut self, listing: DirectoryListing) {
        self.current_path = path::normalize(&listing.path);
        self.listing = Some(listing);
        self.last_error = None;
        self.loading = None;
    }

    /// Record a failure. The previous listing stays visible but stale.
    pub(crate) fn apply_error(&mut self, error: ErrorInfo) {
        self.last_error = Some(error);
        self.loading = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NavigationError;
    use crate::files::FileEntry;

    #[test]
    fn default_state_is_root_without_listing() {
        let state = DirectoryState::default();
        assert_eq!(state.current_path, "/");
        assert!(state.listing.is_none());
        assert!(state.last_error.is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn apply_listing_uses_server_path_and_clears_error() {
        let mut state = DirectoryState::default();
        state.apply_error(ErrorInfo::from(&NavigationError::Network("x".into())));
        state.begin_loading("/docs");

        state.apply_listing(DirectoryListing::new(
            "/Docs/",
            vec![FileEntry::file("a.txt", "/Docs/a.txt", 1)],
        ));

        assert_eq!(state.current_path, "/Docs");
        assert!(state.last_error.is_none());
        assert!(!state.is_loading());
        assert_eq!(state.listing.unwrap().files.len(), 1);
    }

    #[test]
    fn apply_error_keeps_previous_listing() {
        let mut state = DirectoryState::default();
        state.apply_listing(DirectoryListing::new("/a", vec![]));
        state.begin_loading("/b");

        state.apply_error(ErrorInfo::from(&NavigationError::Malformed("bad".into())));

        assert_eq!(state.current_path, "/a");
        assert_eq!(state.listing.as_ref().unwrap().path, "/a");
        assert!(state.last_error.is_some());
        assert!(!state.is_loading());
    }
}
