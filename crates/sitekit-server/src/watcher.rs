//! File watching with per-topic debounce.
//!
//! Three independent watch rules: the stylesheet tree, the script entry
//! files, and the markup pages at the source root. Each topic debounces with
//! a 500 ms quiet period; a new event inside the quiet period restarts that
//! topic's timer without affecting the others.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use sitekit_assets::SiteConfig;

/// Quiet period before a topic fires.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// What changed, and therefore which transform to re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTopic {
    /// Stylesheet tree changed: re-run the style transform
    Styles,

    /// A script entry changed: re-run the script transform
    Scripts,

    /// A markup page changed: refresh the browser directly
    Markup,
}

/// Errors that can occur setting up the watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },
}

/// Canonicalized roots used to classify raw notify events.
#[derive(Debug, Clone)]
struct Rules {
    styles_root: Option<PathBuf>,
    script_entries: Vec<PathBuf>,
    markup_root: Option<PathBuf>,
}

impl Rules {
    fn classify(&self, path: &Path) -> Option<WatchTopic> {
        if self.script_entries.iter().any(|e| e == path) {
            return Some(WatchTopic::Scripts);
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        if let Some(root) = &self.styles_root {
            if path.starts_with(root) && matches!(ext, "scss" | "css") {
                return Some(WatchTopic::Styles);
            }
        }

        // Markup rule is non-recursive: pages directly at the source root
        if let Some(root) = &self.markup_root {
            if path.parent() == Some(root.as_path()) && ext == "html" {
                return Some(WatchTopic::Markup);
            }
        }

        None
    }
}

/// File watcher emitting debounced topic notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch the configured source trees.
    ///
    /// Returns the watcher and the channel debounced topics arrive on. The
    /// watcher must be kept alive for events to flow. Watch roots that do
    /// not exist yet are skipped.
    pub fn new(config: &SiteConfig) -> Result<(Self, async_mpsc::Receiver<WatchTopic>), WatchError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(64);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| WatchError::Watch {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;

        let styles_root = watch_root(&mut watcher, &config.src.scss, RecursiveMode::Recursive)?;
        let markup_root = watch_root(&mut watcher, &config.src.home, RecursiveMode::NonRecursive)?;

        let mut script_entries = Vec::new();
        for entry in config.script_entries() {
            if let Some(canonical) = watch_root(&mut watcher, &entry, RecursiveMode::NonRecursive)? {
                script_entries.push(canonical);
            }
        }

        let rules = Rules {
            styles_root,
            script_entries,
            markup_root,
        };

        std::thread::spawn(move || debounce_loop(sync_rx, async_tx, rules));

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Register a watch root, returning its canonical path (notify reports
/// canonical paths on most platforms). Missing roots are skipped.
fn watch_root(
    watcher: &mut RecommendedWatcher,
    path: &Path,
    mode: RecursiveMode,
) -> Result<Option<PathBuf>, WatchError> {
    if !path.exists() {
        tracing::debug!("Watch root {} does not exist, skipping", path.display());
        return Ok(None);
    }
    watcher.watch(path, mode).map_err(|e| WatchError::Watch {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Ok(Some(canonical))
}

/// Bridge raw notify events into debounced topic notifications.
///
/// Maintains one deadline per topic; every matching event pushes that
/// topic's deadline out by the full quiet period.
fn debounce_loop(
    sync_rx: mpsc::Receiver<notify::Event>,
    async_tx: async_mpsc::Sender<WatchTopic>,
    rules: Rules,
) {
    let mut pending: HashMap<WatchTopic, Instant> = HashMap::new();

    loop {
        let timeout = pending
            .values()
            .min()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));

        match sync_rx.recv_timeout(timeout) {
            Ok(event) => {
                if !is_mutation(&event.kind) {
                    continue;
                }
                for path in &event.paths {
                    if let Some(topic) = rules.classify(path) {
                        pending.insert(topic, Instant::now() + DEBOUNCE);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        let due: Vec<WatchTopic> = pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(topic, _)| *topic)
            .collect();

        for topic in due {
            pending.remove(&topic);
            if async_tx.blocking_send(topic).is_err() {
                return;
            }
        }
    }
}

/// Whether an event kind represents a content mutation worth acting on.
fn is_mutation(kind: &notify::EventKind) -> bool {
    use notify::EventKind;
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
