//! User-facing collaborators: notifications and file selection

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Fire-and-forget user notification. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Presents a file selection restricted to `extensions`; `None` if cancelled
pub trait FilePicker {
    fn pick_file(&self, extensions: &[&str]) -> Option<PathBuf>;
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success => info!(target: "notify", "{}", message),
            NotificationKind::Error => error!(target: "notify", "{}", message),
        }
    }
}

/// Keeps the most recent notification for display in a status line
#[derive(Debug, Default, Clone)]
pub struct StatusNotifier {
    last: Arc<Mutex<Option<(NotificationKind, String)>>>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last notification, if any
    pub fn last(&self) -> Option<(NotificationKind, String)> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

impl Notifier for StatusNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        TracingNotifier.notify(kind, message);
        if let Ok(mut last) = self.last.lock() {
            *last = Some((kind, message.to_string()));
        }
    }
}

/// A picker answering with a path chosen up front (command line argument or
/// a path typed into the UI). An empty choice counts as cancellation.
#[derive(Debug, Clone, Default)]
pub struct StaticFilePicker {
    choice: Option<PathBuf>,
}

impl StaticFilePicker {
    pub fn new(choice: impl Into<PathBuf>) -> Self {
        let choice: PathBuf = choice.into();
        Self {
            choice: (!choice.as_os_str().is_empty()).then_some(choice),
        }
    }

    pub fn cancelled() -> Self {
        Self { choice: None }
    }
}

impl FilePicker for StaticFilePicker {
    fn pick_file(&self, extensions: &[&str]) -> Option<PathBuf> {
        let path = self.choice.as_ref()?;
        if has_extension(path, extensions) {
            Some(path.clone())
        } else {
            warn!(
                target: "import",
                "{} does not match {:?}, ignoring",
                path.display(),
                extensions
            );
            None
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
