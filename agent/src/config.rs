//! Agent configuration and cache generation naming.
//!
//! A generation's bucket ids embed the version tag. Bumping [`CACHE_VERSION`]
//! whenever the manifest or the caching policy changes is what forces the
//! install → activate cycle to evict the old buckets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Version tag compiled into this build of the agent.
pub const CACHE_VERSION: &str = "v1";

const STATIC_CACHE_PREFIX: &str = "s3-static-";
const DYNAMIC_CACHE_PREFIX: &str = "s3-dynamic-";

/// Assets guaranteed to be available offline once a generation installs.
pub const STATIC_MANIFEST: &[&str] = &[
    "/",
    "/static/css/style.css",
    "/static/js/app.js",
    "/static/images/logo.svg",
    "/static/images/favicon.svg",
    "/static/manifest.json",
];

/// The pair of buckets owned by one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheGeneration {
    pub version: String,
    pub static_cache_id: String,
    pub dynamic_cache_id: String,
}

impl CacheGeneration {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            static_cache_id: format!("{STATIC_CACHE_PREFIX}{version}"),
            dynamic_cache_id: format!("{DYNAMIC_CACHE_PREFIX}{version}"),
        }
    }

    /// Whether a bucket id belongs to this generation.
    pub fn owns(&self, cache_id: &str) -> bool {
        cache_id == self.static_cache_id || cache_id == self.dynamic_cache_id
    }
}

/// Agent configuration.
///
/// - `skip_waiting`: activate a freshly installed generation immediately
///   instead of waiting for views of the old one to close.
/// - `navigation_fallback`: serve the cached home document when a
///   navigation request fails on the network.
/// - `cache_dir`: persist buckets on disk; in memory when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
    #[serde(default = "default_home_document")]
    pub home_document: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_true")]
    pub skip_waiting: bool,
    #[serde(default = "default_true")]
    pub navigation_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            manifest: default_manifest(),
            home_document: default_home_document(),
            api_prefix: default_api_prefix(),
            skip_waiting: true,
            navigation_fallback: true,
            cache_dir: None,
        }
    }
}

impl AgentConfig {
    pub fn generation(&self) -> CacheGeneration {
        CacheGeneration::new(&self.version)
    }

    /// Same configuration under another version tag.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }
}

// --- Default value functions ---

fn default_version() -> String {
    CACHE_VERSION.to_string()
}

fn default_manifest() -> Vec<String> {
    STATIC_MANIFEST.iter().map(|s| s.to_string()).collect()
}

fn default_home_document() -> String {
    "/".to_string()
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_true() -> bool {
    true
}
