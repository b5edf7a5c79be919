//! End-to-end browsing: navigation controller driving the view model.

use std::collections::HashMap;
use std::sync::Mutex;

use s3browser_core::api;
use s3browser_core::errors::{ErrorKind, NavigationError};
use s3browser_core::files::browser::ListingSource;
use s3browser_core::files::{DirectoryListing, FileEntry};
use s3browser_core::navigation::{NavigationController, NavigationOutcome};
use s3browser_core::render::icons::IconCategory;
use s3browser_core::render::{present, EntryAction, ViewHandlers};
use tokio::sync::oneshot;

/// Backend answering with raw HTTP status and body, like the real endpoint.
struct WireSource {
    responses: HashMap<String, (u16, String)>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl WireSource {
    fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "/".to_string(),
            (
                200,
                r#"{"path":"/","files":[
                    {"name":"photos","path":"/photos","is_directory":true},
                    {"name":"README.md","path":"/README.md","is_directory":false,"size":300}
                ],"has_more":false}"#
                    .to_string(),
            ),
        );
        responses.insert(
            "/photos".to_string(),
            (
                200,
                r#"{"path":"/photos/","files":[
                    {"name":"b.jpg","path":"/photos/b.jpg","is_directory":false,"size":2048,"mime_type":"image/jpeg"},
                    {"name":"2024","path":"/photos/2024","is_directory":true},
                    {"name":"a.tar.gz","path":"/photos/a.tar.gz","is_directory":false,"size":1048576}
                ],"has_more":false}"#
                    .to_string(),
            ),
        );
        responses.insert(
            "/private".to_string(),
            (403, r#"{"error":"Access denied"}"#.to_string()),
        );
        responses.insert("/broken".to_string(), (200, "<html>".to_string()));
        Self {
            responses,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, path: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(path.to_string(), rx);
        tx
    }
}

#[async_trait::async_trait]
impl ListingSource for WireSource {
    async fn list(&self, path: &str) -> Result<DirectoryListing, NavigationError> {
        let gate = self.gates.lock().unwrap().remove(path);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.responses.get(path) {
            Some((status, body)) => api::parse_listing(*status, body.as_bytes()),
            None => Err(NavigationError::Network("connection refused".into())),
        }
    }
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl ViewHandlers for Recorder {
    fn on_navigate(&self, path: &str) {
        self.calls.lock().unwrap().push(format!("navigate {path}"));
    }
    fn on_download(&self, path: &str) {
        self.calls.lock().unwrap().push(format!("download {path}"));
    }
}

#[tokio::test]
async fn browse_into_directory_and_back() {
    let controller = NavigationController::new(WireSource::new());

    assert_eq!(controller.navigate("/").await, NavigationOutcome::Loaded);
    let root = present(&controller.state().await);
    assert_eq!(root.parent, None);
    assert_eq!(root.breadcrumb.len(), 1);
    let names: Vec<_> = root.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["photos", "README.md"]);

    let recorder = Recorder::default();
    root.entries[0].action.dispatch(&recorder);
    assert_eq!(*recorder.calls.lock().unwrap(), vec!["navigate /photos"]);

    assert_eq!(controller.navigate("/photos").await, NavigationOutcome::Loaded);
    let photos = present(&controller.state().await);
    // Server path wins and is normalized.
    assert_eq!(photos.current_path, "/photos");
    let names: Vec<_> = photos.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["2024", "a.tar.gz", "b.jpg"]);
    let icons: Vec<_> = photos.entries.iter().map(|e| e.icon).collect();
    assert_eq!(
        icons,
        vec![
            IconCategory::Directory,
            IconCategory::Archive,
            IconCategory::Image
        ]
    );
    assert_eq!(photos.entries[1].size_label.as_deref(), Some("1.00 MB"));
    assert_eq!(photos.entries[2].size_label.as_deref(), Some("2.00 KB"));
    assert_eq!(
        photos.entries[2].action,
        EntryAction::Download("/photos/b.jpg".into())
    );
    assert_eq!(photos.parent, Some(EntryAction::Navigate("/".into())));
    assert_eq!(photos.footer(), "1 folder, 2 files, 1.00 MB");

    assert_eq!(controller.go_to_parent().await, NavigationOutcome::Loaded);
    assert_eq!(controller.state().await.current_path, "/");
}

#[tokio::test]
async fn failures_keep_previous_listing_and_flip_indicator() {
    let controller = NavigationController::new(WireSource::new());
    controller.navigate("/photos").await;

    let outcome = controller.navigate("/private").await;
    assert_eq!(
        outcome,
        NavigationOutcome::Failed(NavigationError::Status {
            status: 403,
            message: "Access denied".into()
        })
    );
    let view = present(&controller.state().await);
    assert!(!view.connected);
    assert_eq!(view.current_path, "/photos");
    assert_eq!(view.entries.len(), 3);
    let error = view.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Status);
    assert_eq!(error.status, Some(403));

    assert!(matches!(
        controller.navigate("/broken").await,
        NavigationOutcome::Failed(NavigationError::Malformed(_))
    ));
    assert!(matches!(
        controller.navigate("/offline").await,
        NavigationOutcome::Failed(NavigationError::Network(_))
    ));

    // A later success reconnects.
    controller.refresh().await;
    assert!(present(&controller.state().await).connected);
}

#[tokio::test]
async fn latest_navigation_wins_over_slow_response() {
    let source = WireSource::new();
    let release_photos = source.gate("/photos");
    let controller = NavigationController::new(source);

    let slow = controller.navigate("/photos");
    let fast = async {
        let outcome = controller.navigate("/").await;
        let _ = release_photos.send(());
        outcome
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(fast, NavigationOutcome::Loaded);
    assert_eq!(slow, NavigationOutcome::Superseded);
    let view = present(&controller.state().await);
    assert_eq!(view.current_path, "/");
    assert!(!view.loading);
}
