//! Deterministic mapping from [`DirectoryState`] to a toolkit-agnostic view.
//!
//! Nothing here performs I/O. The UI layer paints a [`ViewModel`] and routes
//! user actions back through [`ViewHandlers`].

pub mod format;
pub mod icons;

use serde::Serialize;

use crate::errors::ErrorInfo;
use crate::files::{FileEntry, ListingStats};
use crate::path;
use crate::state::DirectoryState;

use self::icons::{IconCategory, IconInput};

/// Label of the synthetic root crumb.
pub const HOME_LABEL: &str = "Home";

/// Callbacks the UI layer registers for entry actions.
pub trait ViewHandlers {
    fn on_navigate(&self, path: &str);
    fn on_download(&self, path: &str);
}

/// What activating an entry does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "camelCase")]
pub enum EntryAction {
    Navigate(String),
    Download(String),
}

impl EntryAction {
    pub fn dispatch(&self, handlers: &dyn ViewHandlers) {
        match self {
            EntryAction::Navigate(path) => handlers.on_navigate(path),
            EntryAction::Download(path) => handlers.on_download(path),
        }
    }
}

/// One breadcrumb link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub label: String,
    pub path: String,
}

/// One row of the file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub icon: IconCategory,
    /// `None` for directories.
    pub size_label: Option<String>,
    pub action: EntryAction,
}

/// Everything the UI needs to paint one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub current_path: String,
    pub breadcrumb: Vec<Crumb>,
    /// The `..` row; absent at the root.
    pub parent: Option<EntryAction>,
    pub entries: Vec<EntryView>,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
    /// Connection indicator; flips off whenever the last navigation failed.
    pub connected: bool,
    pub stats: ListingStats,
}

impl ViewModel {
    pub fn footer(&self) -> String {
        format::stats_label(&self.stats)
    }
}

/// Compute the view for a state snapshot.
pub fn present(state: &DirectoryState) -> ViewModel {
    let (entries, stats) = match &state.listing {
        Some(listing) => (
            sort_entries(&listing.files)
                .into_iter()
                .map(entry_view)
                .collect(),
            listing.stats(),
        ),
        None => (Vec::new(), ListingStats::default()),
    };

    let parent = if path::is_root(&state.current_path) {
        None
    } else {
        Some(EntryAction::Navigate(path::parent(&state.current_path)))
    };

    ViewModel {
        current_path: state.current_path.clone(),
        breadcrumb: breadcrumb(&state.current_path),
        parent,
        entries,
        loading: state.is_loading(),
        error: state.last_error.clone(),
        connected: state.last_error.is_none(),
        stats,
    }
}

/// Directories first, then files; names compared with
/// [`format::compare_names`]. The sort is stable, so entries with equal
/// names keep their listing order.
pub fn sort_entries(files: &[FileEntry]) -> Vec<&FileEntry> {
    let mut sorted: Vec<&FileEntry> = files.iter().collect();
    sorted.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| format::compare_names(&a.name, &b.name))
    });
    sorted
}

/// `Home` followed by one crumb per segment, each pointing at the cumulative
/// path up to and including that segment.
pub fn breadcrumb(current_path: &str) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        label: HOME_LABEL.to_string(),
        path: path::ROOT.to_string(),
    }];
    let mut cumulative = String::new();
    for segment in path::segments(current_path) {
        cumulative.push('/');
        cumulative.push_str(&segment);
        crumbs.push(Crumb {
            label: segment,
            path: cumulative.clone(),
        });
    }
    crumbs
}

fn entry_view(entry: &FileEntry) -> EntryView {
    let icon = icons::classify(&IconInput {
        is_directory: entry.is_directory,
        mime_type: entry.mime_type.as_deref(),
        name: &entry.name,
    });
    let (size_label, action) = if entry.is_directory {
        (None, EntryAction::Navigate(entry.path.clone()))
    } else {
        (
            Some(format::format_size(entry.size)),
            EntryAction::Download(entry.path.clone()),
        )
    };
    EntryView {
        name: entry.name.clone(),
        path: entry.path.clone(),
        is_directory: entry.is_directory,
        icon,
        size_label,
        action,
    }
}
