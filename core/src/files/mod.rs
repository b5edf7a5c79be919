pub mod browser;

use serde::{Deserialize, Serialize};

/// A file or directory entry as returned by the listing endpoint.
///
/// Field names match the backend's snake_case JSON. Entries are immutable
/// once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    /// Size in bytes; only meaningful for files.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// RFC 3339 timestamp, when the backend knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl FileEntry {
    /// Build a file entry with only the fields the view needs.
    pub fn file(name: &str, path: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            is_directory: false,
            size,
            mime_type: None,
            last_modified: None,
            etag: None,
        }
    }

    /// Build a directory entry.
    pub fn directory(name: &str, path: &str) -> Self {
        Self {
            is_directory: true,
            ..Self::file(name, path, 0)
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }
}

/// One page of directory contents for a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    /// Accepted from the wire; the client never requests further pages.
    #[serde(default)]
    pub has_more: bool,
}

impl DirectoryListing {
    pub fn new(path: &str, files: Vec<FileEntry>) -> Self {
        Self {
            path: path.to_string(),
            files,
            has_more: false,
        }
    }

    /// Count directories, files and the total byte size of the files.
    pub fn stats(&self) -> ListingStats {
        let mut stats = ListingStats::default();
        for entry in &self.files {
            if entry.is_directory {
                stats.directories += 1;
            } else {
                stats.files += 1;
                stats.total_bytes += entry.size;
            }
        }
        stats
    }
}

/// Aggregate numbers shown in the footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStats {
    pub directories: usize,
    pub files: usize,
    pub total_bytes: u64,
}
