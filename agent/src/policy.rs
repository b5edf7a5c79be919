//! Pure fetch policy, separate from the side-effecting fetch/store path.

use url::{Origin, Url};

use crate::http::{Method, Request, Response, ResponseType};

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Straight to the network; the cache is never read or written.
    Passthrough,
    /// Cache lookup first, network on a miss.
    CacheFirst,
}

/// Classification rules for one agent origin.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    origin: Origin,
    api_prefix: String,
}

impl FetchPolicy {
    pub fn new(origin: &Url, api_prefix: &str) -> Self {
        Self {
            origin: origin.origin(),
            api_prefix: api_prefix.to_string(),
        }
    }

    /// API calls and foreign origins pass through; everything else is
    /// cache-first. The API bypass is absolute: it is decided before any
    /// cache lookup.
    pub fn classify(&self, request: &Request) -> FetchDecision {
        if request.url.path().starts_with(&self.api_prefix) {
            return FetchDecision::Passthrough;
        }
        if request.url.origin() != self.origin {
            return FetchDecision::Passthrough;
        }
        FetchDecision::CacheFirst
    }

    /// Whether a network response may be written through to the dynamic
    /// bucket: a same-origin `200` answer to a `GET`.
    pub fn should_store(&self, request: &Request, response: &Response) -> bool {
        request.method == Method::Get
            && response.status == 200
            && response.response_type == ResponseType::Basic
    }
}
