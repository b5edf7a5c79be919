//! Backend access through the caching agent.
//!
//! Every request is issued on behalf of one agent view, so the generation
//! controlling that view decides whether it is served from cache.

use anyhow::{bail, Context, Result};
use s3browser_agent::http::Request;
use s3browser_agent::registration::ViewId;
use s3browser_agent::AgentHandle;
use s3browser_core::api;
use s3browser_core::errors::NavigationError;
use s3browser_core::files::browser::ListingSource;
use s3browser_core::files::DirectoryListing;
use s3browser_core::version;
use tracing::debug;
use url::Url;

pub struct AgentTransport {
    handle: AgentHandle,
    view: ViewId,
    base: Url,
}

impl AgentTransport {
    pub fn new(handle: AgentHandle, view: ViewId, base: Url) -> Self {
        Self { handle, view, base }
    }

    pub fn handle(&self) -> &AgentHandle {
        &self.handle
    }

    /// Backend build label; never fails.
    pub async fn version_label(&self) -> String {
        let request = Request::get(api::version_url(&self.base));
        match self.handle.fetch(self.view, request).await {
            Ok(resp) => version::label_from_response(resp.status, &resp.body),
            Err(e) => {
                debug!("Version request failed: {}", e);
                version::FALLBACK_LABEL.to_string()
            }
        }
    }

    /// Fetch a file's contents.
    pub async fn download(&self, file: &str) -> Result<Vec<u8>> {
        let request = Request::get(api::download_url(&self.base, file));
        let resp = self
            .handle
            .fetch(self.view, request)
            .await
            .with_context(|| format!("Failed to download {file}"))?;
        if !resp.is_ok() {
            let message = serde_json::from_slice::<api::ErrorResponse>(&resp.body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("HTTP {}", resp.status));
            bail!("Failed to download {file}: {message}");
        }
        Ok(resp.body)
    }
}

#[async_trait::async_trait]
impl ListingSource for AgentTransport {
    async fn list(&self, path: &str) -> Result<DirectoryListing, NavigationError> {
        let request = Request::get(api::list_url(&self.base, path));
        let resp = self
            .handle
            .fetch(self.view, request)
            .await
            .map_err(|e| NavigationError::Network(e.to_string()))?;
        api::parse_listing(resp.status, &resp.body)
    }
}
