//! Bidirectional sync between the authoritative buffer and the surface
//!
//! Outward: buffer changes are debounced and pushed as a full-text `update`,
//! unless the surface is active (then the surface is assumed to be the source
//! of the change, or the user is typing in it).
//!
//! Inward: `edit` messages replace the whole buffer, and only while the
//! surface is active. A full replace is idempotent, so duplicate or retried
//! messages need no sequencing.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::commands::Cmd;
use crate::document::{display_name, Binding};
use crate::messages::HostMsg;

/// Default coalescing window for outward pushes
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Prefix shown in the panel title while the buffer has unsaved changes
pub const DIRTY_MARKER: &str = "[edit] ";

/// Restartable one-shot timer
#[derive(Debug, Clone)]
pub struct Debounce {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Start the timer, or restart it if already pending
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the timer if it has expired
    pub fn take_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Host-side view of one rendering surface
#[derive(Debug, Clone, Default)]
pub struct SurfaceSession {
    /// Surface has focus; inbound pushes are suppressed and edits accepted
    pub active: bool,
    /// Surface completed the `ready` handshake
    pub ready: bool,
    /// Last content known to be shown by (or sent from) the surface
    pub last_content: String,
}

/// What happened to an inbound edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Buffer replaced with the edit's content
    Applied,
    /// Buffer already had this content
    Unchanged,
    /// Surface was not active; the edit is stale
    Ignored,
    /// Edit was based on a revision older than the last external change
    Rejected,
}

/// Errors writing inbound content
#[derive(Debug)]
pub enum SyncError {
    /// Writing the buffer or file to disk failed
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SyncError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Write { path, source } => {
                format!("Failed to save {}: {}", display_name(path), source)
            }
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write { path, source } => write!(f, "write {}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Write { source, .. } => Some(source),
        }
    }
}

/// Panel title for a binding
pub fn title_for(binding: &Binding) -> String {
    let name = display_name(binding.path());
    if binding.is_dirty() {
        format!("{DIRTY_MARKER}{name}")
    } else {
        name
    }
}

/// Sync state for one session
#[derive(Debug, Clone)]
pub struct SyncEngine {
    push: Debounce,
    /// Dirty flag the current title reflects
    shown_dirty: Option<bool>,
    /// Buffer revision of the most recent change not made by the surface
    external_revision: u64,
}

impl SyncEngine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            push: Debounce::new(debounce),
            shown_dirty: None,
            external_revision: 0,
        }
    }

    /// Record the dirty state a freshly set title already shows
    pub fn prime(&mut self, binding: &Binding) {
        self.shown_dirty = Some(binding.is_dirty());
        self.external_revision = binding.document().map_or(0, |doc| doc.revision());
    }

    /// Next time [`SyncEngine::poll`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.push.deadline()
    }

    pub fn has_pending_push(&self) -> bool {
        self.push.is_pending()
    }

    /// Drop any pending outward push
    pub fn cancel(&mut self) {
        self.push.cancel();
    }

    /// The bound buffer changed outside the surface.
    ///
    /// Returns whether an outward push was scheduled.
    pub fn document_changed(
        &mut self,
        binding: &Binding,
        session: &SurfaceSession,
        now: Instant,
    ) -> bool {
        let Some(doc) = binding.document() else {
            return false;
        };
        self.external_revision = doc.revision();
        if session.active {
            tracing::debug!(
                "Surface active, not pushing revision {} of {}",
                doc.revision(),
                doc.path.display()
            );
            return false;
        }
        self.push.schedule(now);
        true
    }

    /// Fire the outward push if its debounce window has elapsed
    pub fn poll(&mut self, now: Instant, binding: &Binding, session: &mut SurfaceSession) -> Cmd {
        if !self.push.take_if_due(now) {
            return Cmd::None;
        }
        let Some(doc) = binding.document() else {
            return Cmd::None;
        };
        tracing::debug!("Pushing revision {} to surface", doc.revision());
        session.last_content = doc.text();
        Cmd::batch(vec![
            Cmd::Post(HostMsg::update(session.last_content.clone(), doc.revision())),
            self.refresh_title(binding),
        ])
    }

    /// Apply an `edit` message from the surface
    pub fn apply_edit(
        &mut self,
        binding: &mut Binding,
        session: &mut SurfaceSession,
        content: String,
        base_revision: Option<u64>,
    ) -> Result<(EditOutcome, Cmd), SyncError> {
        if !session.active {
            tracing::debug!("Ignoring edit from inactive surface");
            session.last_content = content;
            return Ok((EditOutcome::Ignored, Cmd::None));
        }

        if let (Some(base), Some(doc)) = (base_revision, binding.document()) {
            if base < self.external_revision {
                tracing::warn!(
                    "Rejecting edit based on revision {} (buffer changed externally at {})",
                    base,
                    self.external_revision
                );
                session.last_content = doc.text();
                let resync = HostMsg::update(session.last_content.clone(), doc.revision());
                return Ok((EditOutcome::Rejected, Cmd::Post(resync)));
            }
        }

        session.last_content = content;
        let changed = write_inward(binding, &session.last_content)?;
        let outcome = if changed {
            EditOutcome::Applied
        } else {
            EditOutcome::Unchanged
        };
        Ok((outcome, self.refresh_title(binding)))
    }

    /// Apply a `save` message: replace regardless of focus, then persist
    pub fn save(
        &mut self,
        binding: &mut Binding,
        session: &mut SurfaceSession,
        content: Option<String>,
    ) -> Result<Cmd, SyncError> {
        if let Some(content) = content {
            session.last_content = content;
        }
        write_inward(binding, &session.last_content)?;
        if let Binding::Buffer(doc) = binding {
            doc.save().map_err(|source| SyncError::Write {
                path: doc.path.clone(),
                source,
            })?;
        }
        Ok(self.refresh_title(binding))
    }

    /// Title update, only when the dirty flag flipped since the last one
    pub fn refresh_title(&mut self, binding: &Binding) -> Cmd {
        let dirty = binding.is_dirty();
        if self.shown_dirty == Some(dirty) {
            return Cmd::None;
        }
        self.shown_dirty = Some(dirty);
        Cmd::SetTitle(title_for(binding))
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Replace the bound target's text. Raw files are written straight to disk.
fn write_inward(binding: &mut Binding, content: &str) -> Result<bool, SyncError> {
    match binding {
        Binding::Buffer(doc) => Ok(doc.replace_all(content)),
        Binding::RawFile(path) => {
            let unchanged = std::fs::read_to_string(&*path).is_ok_and(|current| current == content);
            if unchanged {
                return Ok(false);
            }
            std::fs::write(&*path, content).map_err(|source| SyncError::Write {
                path: path.clone(),
                source,
            })?;
            Ok(true)
        }
    }
}
