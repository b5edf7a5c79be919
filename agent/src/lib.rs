//! Offline caching agent for the S3 browser client.
//!
//! A versioned cache of the client's static assets that intercepts the
//! client's requests: cache-first for same-origin assets, straight to the
//! network for API calls and foreign origins. Generations install, wait,
//! activate (evicting older buckets) and serve, all inside a background
//! task reached through [`host::AgentHandle`].

pub mod config;
pub mod errors;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod network;
pub mod notify;
pub mod policy;
pub mod registration;
pub mod storage;

pub use config::AgentConfig;
pub use host::{AgentHandle, AgentHost};
pub use lifecycle::{CacheAgent, LifecycleState};
