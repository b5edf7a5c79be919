//! Backend build information shown in the footer.
//!
//! Label rules:
//! - a reported `version` is shown as is
//! - no `version` means a development build: `dev-<commit prefix>` or `dev`
//! - any failure to reach or decode the endpoint yields [`FALLBACK_LABEL`]

use serde::Deserialize;

/// Shown when the version endpoint is unreachable or unreadable.
pub const FALLBACK_LABEL: &str = "unknown";

/// Number of commit hash characters kept in development labels.
const SHORT_COMMIT_LEN: usize = 8;

/// Payload of `GET /api/version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub git_commit: Option<String>,
    #[serde(default)]
    pub build_time: Option<String>,
}

impl VersionInfo {
    /// Display label for this build.
    pub fn label(&self) -> String {
        match self.version.as_deref().filter(|v| !v.is_empty() && *v != "dev") {
            Some(version) => version.to_string(),
            None => match self.git_commit.as_deref().filter(|c| !c.is_empty() && *c != "unknown") {
                Some(commit) => {
                    let short: String = commit.chars().take(SHORT_COMMIT_LEN).collect();
                    format!("dev-{short}")
                }
                None => "dev".to_string(),
            },
        }
    }
}

/// Decode a version response into a label, never failing.
pub fn label_from_response(status: u16, body: &[u8]) -> String {
    if !(200..300).contains(&status) {
        return FALLBACK_LABEL.to_string();
    }
    serde_json::from_slice::<VersionInfo>(body)
        .map(|info| info.label())
        .unwrap_or_else(|_| FALLBACK_LABEL.to_string())
}
