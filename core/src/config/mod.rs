use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::API_PREFIX;
use crate::errors::CoreError;
use crate::path;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "S3BROWSER_URL";
/// Environment variable overriding [`ClientConfig::start_path`].
pub const ENV_START_PATH: &str = "S3BROWSER_START_PATH";

/// Client configuration.
///
/// - `base_url`: origin of the backend; also the origin the caching agent
///   considers its own.
/// - `api_prefix`: requests under this path are never cached.
/// - `start_path`: directory opened on startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_start_path")]
    pub start_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            start_path: default_start_path(),
        }
    }
}

impl ClientConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load_from(file: &Path) -> Result<Self, CoreError> {
        let data = std::fs::read_to_string(file)?;
        let config: ClientConfig = serde_json::from_str(&data)?;
        config.validated()
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Empty values are ignored, like unset ones.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(start) = lookup(ENV_START_PATH).filter(|v| !v.is_empty()) {
            self.start_path = start;
        }
        self
    }

    /// Apply overrides from the process environment.
    pub fn with_process_env(self) -> Self {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Check field values and normalize paths.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        let url = self.parsed_base_url()?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "baseUrl must be an http(s) URL: {}",
                self.base_url
            )));
        }
        if !self.api_prefix.starts_with('/') {
            return Err(CoreError::Config(format!(
                "apiPrefix must start with '/': {}",
                self.api_prefix
            )));
        }
        self.start_path = path::normalize(&self.start_path);
        Ok(self)
    }

    pub fn parsed_base_url(&self) -> Result<Url, CoreError> {
        Url::parse(&self.base_url)
            .map_err(|e| CoreError::Config(format!("invalid baseUrl '{}': {e}", self.base_url)))
    }
}

// --- Default value functions ---

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_prefix() -> String {
    API_PREFIX.to_string()
}

fn default_start_path() -> String {
    path::ROOT.to_string()
}
