//! Async listing capability consumed by the navigation controller.
//!
//! The controller never talks HTTP itself. Consumers inject *how* a listing
//! is obtained (direct HTTP, through the caching agent, a test double) by
//! implementing [`ListingSource`].

use crate::errors::NavigationError;
use crate::files::DirectoryListing;

/// Source of directory listings.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the listing for an already normalized path.
    ///
    /// The returned listing's `path` is the server-reported path, which may
    /// differ from the requested one when the backend canonicalizes it.
    async fn list(&self, path: &str) -> Result<DirectoryListing, NavigationError>;
}
