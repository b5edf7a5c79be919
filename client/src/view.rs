//! Plain-text painter for the view model.

use std::fmt::Write as _;
use std::sync::Mutex;

use s3browser_core::render::icons::IconCategory;
use s3browser_core::render::{EntryAction, ViewHandlers, ViewModel};

fn icon_tag(icon: IconCategory) -> &'static str {
    match icon {
        IconCategory::Directory => "dir",
        IconCategory::Image => "img",
        IconCategory::Video => "vid",
        IconCategory::Audio => "aud",
        IconCategory::Pdf => "pdf",
        IconCategory::Archive => "zip",
        IconCategory::Spreadsheet => "xls",
        IconCategory::Document => "doc",
        IconCategory::Presentation => "ppt",
        IconCategory::Text => "txt",
        IconCategory::StructuredData => "dat",
        IconCategory::SourceCode => "src",
        IconCategory::Generic => "---",
    }
}

/// Render a view model as numbered rows.
///
/// Row `0` is the parent entry when there is one; entries are numbered from
/// `1` in display order.
pub fn paint(model: &ViewModel, version: &str) -> String {
    let mut out = String::new();
    let crumbs: Vec<&str> = model.breadcrumb.iter().map(|c| c.label.as_str()).collect();
    let _ = writeln!(out, "{}", crumbs.join(" / "));

    if let Some(error) = &model.error {
        let _ = writeln!(out, "! {}", error.message);
    }
    if model.loading {
        let _ = writeln!(out, "  loading...");
    }

    if model.parent.is_some() {
        let _ = writeln!(out, "  0  [dir] ..");
    }
    if model.entries.is_empty() && !model.loading {
        let _ = writeln!(out, "     (empty)");
    }
    for (i, entry) in model.entries.iter().enumerate() {
        let suffix = if entry.is_directory { "/" } else { "" };
        let size = entry.size_label.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "{:>3}  [{}] {}{}  {}",
            i + 1,
            icon_tag(entry.icon),
            entry.name,
            suffix,
            size
        );
    }

    let status = if model.connected { "connected" } else { "disconnected" };
    let _ = writeln!(out, "{} | {} | {}", model.footer(), status, version);
    out
}

/// The action row `index` maps to, as printed by [`paint`].
pub fn action_at(model: &ViewModel, index: usize) -> Option<EntryAction> {
    match index {
        0 => model.parent.clone(),
        n => model.entries.get(n - 1).map(|e| e.action.clone()),
    }
}

/// Collects the action chosen by the user for the shell loop to perform.
#[derive(Default)]
pub struct PendingAction {
    slot: Mutex<Option<EntryAction>>,
}

impl PendingAction {
    pub fn take(&self) -> Option<EntryAction> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }

    fn set(&self, action: EntryAction) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(action);
        }
    }
}

impl ViewHandlers for PendingAction {
    fn on_navigate(&self, path: &str) {
        self.set(EntryAction::Navigate(path.to_string()));
    }

    fn on_download(&self, path: &str) {
        self.set(EntryAction::Download(path.to_string()));
    }
}
