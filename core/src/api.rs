//! URL construction and response decoding for the backend HTTP surface.
//!
//! - `GET /api/list?path=<path>` → `{ path, files, has_more }` or `{ error }`
//! - `GET /api/download?file=<path>` → binary payload
//! - `GET /api/version` → `{ version?, git_commit?, build_time? }`

use serde::Deserialize;
use url::Url;

use crate::errors::NavigationError;
use crate::files::DirectoryListing;
use crate::path;

/// Path prefix shared by every backend endpoint.
pub const API_PREFIX: &str = "/api/";

/// Error body sent with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn endpoint(base: &Url, name: &str) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("{API_PREFIX}{name}"));
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// URL of the listing endpoint for `dir`; the path is percent-encoded.
pub fn list_url(base: &Url, dir: &str) -> Url {
    let mut url = endpoint(base, "list");
    url.query_pairs_mut()
        .append_pair("path", &path::normalize(dir));
    url
}

/// URL of the download endpoint for `file`.
pub fn download_url(base: &Url, file: &str) -> Url {
    let mut url = endpoint(base, "download");
    url.query_pairs_mut().append_pair("file", file);
    url
}

/// URL of the version endpoint.
pub fn version_url(base: &Url) -> Url {
    endpoint(base, "version")
}

/// Decode a listing response.
///
/// Non-success statuses become [`NavigationError::Status`] carrying the
/// backend's `error` message when the body has one. A success status with a
/// body that is not a listing becomes [`NavigationError::Malformed`].
pub fn parse_listing(status: u16, body: &[u8]) -> Result<DirectoryListing, NavigationError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<ErrorResponse>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        return Err(NavigationError::Status { status, message });
    }
    serde_json::from_slice(body).map_err(|e| NavigationError::Malformed(e.to_string()))
}
