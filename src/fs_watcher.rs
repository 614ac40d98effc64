//! File system watching for the bound file
//!
//! Uses the `notify` crate with debouncing to detect changes made to the file
//! by other programs, so the buffer can be reloaded and pushed to the surface.

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// Delay used to coalesce bursts of writes (editors often write in several steps)
const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// What happened to the watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    /// Written by another program
    Changed,
    /// Deleted or renamed away
    Removed,
}

/// Watcher for a single file
///
/// Watches the parent directory non-recursively, since many editors replace
/// files by renaming, which drops a watch placed on the file itself.
pub struct FileWatcher {
    /// The debouncer handles watching and event coalescing
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    rx: Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    path: PathBuf,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(WATCH_DEBOUNCE, tx)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::NonRecursive)?;

        tracing::info!("Watching {} for external changes", path.display());

        Ok(Self {
            _debouncer: debouncer,
            rx,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain pending events (non-blocking)
    pub fn poll(&self) -> Option<FileEvent> {
        let mut changed = false;

        while let Ok(result) = self.rx.try_recv() {
            match result {
                Ok(events) => {
                    changed |= events.iter().any(|event| {
                        // Continuous events fire while writes are still happening
                        !matches!(event.kind, DebouncedEventKind::AnyContinuous) && self.matches(&event.path)
                    });
                }
                Err(e) => {
                    tracing::warn!("File watcher error: {:?}", e);
                }
            }
        }

        if !changed {
            return None;
        }
        let event = self.current_state();
        tracing::debug!("{} on disk: {:?}", self.path.display(), event);
        Some(event)
    }

    /// Debounced events carry no kind, so removal is read off the file system
    fn current_state(&self) -> FileEvent {
        if self.path.is_file() {
            FileEvent::Changed
        } else {
            FileEvent::Removed
        }
    }

    fn matches(&self, path: &Path) -> bool {
        if path == self.path {
            return true;
        }
        if path.file_name() != self.path.file_name() {
            return false;
        }
        // Events may report canonicalized directories (e.g. /private/var on macOS)
        let canonical = |p: Option<&Path>| p.and_then(|d| d.canonicalize().ok());
        canonical(path.parent()).is_some() && canonical(path.parent()) == canonical(self.path.parent())
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
