//! Panel lifecycle and message routing
//!
//! A [`PanelManager`] owns at most one live [`Panel`]. Opening a different
//! target disposes the current panel first; opening the same target reveals
//! it. Every surface message is routed to exactly one handler here, and every
//! path the surface hands us passes through [`crate::sanitize`] first.

mod subscriptions;

pub use subscriptions::Subscriptions;

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::commands::Cmd;
use crate::config::SurfaceConfig;
use crate::document::{display_name, Binding, Document};
use crate::file_validation::{is_markdown_file, validate_markdown_file, FileOpenError};
use crate::messages::{HostMsg, SourceAction, SurfaceMsg};
use crate::mode::{ModeMachine, Transition};
use crate::options::OptionsStore;
use crate::sanitize::{markdown_relative, resolve_link, resolve_upload_dir, LinkTarget};
use crate::sync::{title_for, SurfaceSession, SyncEngine};
use crate::upload::save_uploads;

/// Why a panel went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeReason {
    /// Closed by the host (app quitting)
    Closed,
    /// The bound document was closed, removed or renamed
    DocumentClosed,
    /// The panel closed itself (the user closed its window)
    SelfClosed,
    /// A different target was opened
    Replaced,
}

/// Result of [`PanelManager::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The target was already open; the panel was brought forward
    Revealed,
    /// A new panel was created, after disposing `replaced` if set
    Created { replaced: bool },
}

/// Errors opening a panel
#[derive(Debug)]
pub enum PanelError {
    /// The file failed validation
    Open { path: PathBuf, error: FileOpenError },
    /// Reading the file failed after validation
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    /// The open buffer has unsaved edits and would be discarded
    Unsaved { path: PathBuf, target: PathBuf },
}

impl PanelError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Open { path, error } => error.user_message(&display_name(path)),
            Self::Read { path, error } => {
                format!("Failed to read {}: {}", display_name(path), error)
            }
            Self::Unsaved { path, target } => format!(
                "{} has unsaved changes. Save it before opening {}.",
                display_name(path),
                display_name(target)
            ),
        }
    }
}

impl std::fmt::Display for PanelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, error } => write!(f, "{}: {}", path.display(), error),
            Self::Read { path, error } => write!(f, "{}: {}", path.display(), error),
            Self::Unsaved { path, target } => write!(
                f,
                "{}: unsaved changes, not replacing with {}",
                path.display(),
                target.display()
            ),
        }
    }
}

impl std::error::Error for PanelError {}

/// Message shown when a surface message arrives with nothing bound
const NO_TARGET: &str = "No document or file is bound to the editor";

/// One live surface bound to one target
#[derive(Debug)]
pub struct Panel {
    pub binding: Binding,
    pub session: SurfaceSession,
    pub sync: SyncEngine,
    pub mode: ModeMachine,
    subscriptions: Subscriptions,
}

impl Panel {
    pub fn path(&self) -> &Path {
        self.binding.path()
    }

    fn dispose(mut self, reason: DisposeReason) {
        self.sync.cancel();
        let released = self.subscriptions.dispose();
        tracing::info!(
            "Disposed panel for {} ({:?}, {} subscriptions released)",
            self.binding.path().display(),
            reason,
            released
        );
    }
}

/// Owner of the single live panel and the state shared across panels
#[derive(Debug)]
pub struct PanelManager {
    config: SurfaceConfig,
    options: OptionsStore,
    workspace_root: Option<PathBuf>,
    /// Host focus, carried over to panels created while it is held
    active: bool,
    panel: Option<Panel>,
}

impl PanelManager {
    pub fn new(config: SurfaceConfig, options: OptionsStore, workspace_root: Option<PathBuf>) -> Self {
        Self {
            config,
            options,
            workspace_root,
            active: false,
            panel: None,
        }
    }

    pub fn options(&self) -> &OptionsStore {
        &self.options
    }

    pub fn panel(&self) -> Option<&Panel> {
        self.panel.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.panel.is_some()
    }

    /// Bound buffer, if the panel is bound to one
    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.panel.as_mut()?.binding.document_mut()
    }

    /// Page to load into a newly created surface
    pub fn surface_html(&self) -> String {
        crate::page::surface_html(&self.config)
    }

    /// Validate and load `path`, then open it.
    ///
    /// Refuses to replace a buffer with unsaved edits.
    pub fn open_path(&mut self, path: &Path, raw: bool) -> Result<(OpenOutcome, Cmd), PanelError> {
        if let Some(panel) = &self.panel {
            if panel.path() == path {
                tracing::debug!("Revealing existing panel for {}", path.display());
                return Ok((OpenOutcome::Revealed, Cmd::Reveal));
            }
            if panel.binding.document().is_some_and(Document::is_dirty) {
                return Err(PanelError::Unsaved {
                    path: panel.path().to_path_buf(),
                    target: path.to_path_buf(),
                });
            }
        }
        validate_markdown_file(path).map_err(|error| PanelError::Open {
            path: path.to_path_buf(),
            error,
        })?;
        let binding = if raw {
            Binding::RawFile(path.to_path_buf())
        } else {
            let doc = Document::from_file(path.to_path_buf()).map_err(|error| PanelError::Read {
                path: path.to_path_buf(),
                error,
            })?;
            Binding::Buffer(doc)
        };
        Ok(self.open(binding))
    }

    /// Show `binding` in the panel, replacing whatever else is open.
    ///
    /// Unlike [`PanelManager::open_path`] this discards unsaved edits in the
    /// replaced buffer.
    pub fn open(&mut self, binding: Binding) -> (OpenOutcome, Cmd) {
        let replaced = match self.panel.take() {
            Some(panel) if panel.binding.same_target(&binding) => {
                self.panel = Some(panel);
                tracing::debug!("Revealing existing panel for {}", binding.path().display());
                return (OpenOutcome::Revealed, Cmd::Reveal);
            }
            Some(panel) => {
                panel.dispose(DisposeReason::Replaced);
                true
            }
            None => false,
        };

        let mut sync = SyncEngine::new(self.config.debounce());
        sync.prime(&binding);
        let rich = self.options.rich_mode().unwrap_or_default();
        let title = title_for(&binding);
        tracing::info!("Opened panel for {}", binding.path().display());

        self.panel = Some(Panel {
            binding,
            session: SurfaceSession {
                active: self.active,
                ..Default::default()
            },
            sync,
            mode: ModeMachine::new(rich, self.config.preview_mode),
            subscriptions: Subscriptions::new(),
        });
        (OpenOutcome::Created { replaced }, Cmd::SetTitle(title))
    }

    /// Tie a subscription's lifetime to the current panel.
    ///
    /// With no panel open the release runs immediately and `false` is returned.
    pub fn subscribe(&mut self, label: impl Into<String>, release: impl FnOnce() + 'static) -> bool {
        match &mut self.panel {
            Some(panel) => {
                panel.subscriptions.add(label, release);
                true
            }
            None => {
                release();
                false
            }
        }
    }

    /// Dispose the current panel. Returns false if nothing was open.
    pub fn close(&mut self, reason: DisposeReason) -> bool {
        match self.panel.take() {
            Some(panel) => {
                panel.dispose(reason);
                true
            }
            None => false,
        }
    }

    /// The host closed a document; dispose the panel if it was bound to it
    pub fn document_closed(&mut self, path: &Path) -> bool {
        if self.panel.as_ref().is_some_and(|p| p.path() == path) {
            self.close(DisposeReason::DocumentClosed)
        } else {
            false
        }
    }

    /// Surface focus changed
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if let Some(panel) = &mut self.panel {
            panel.session.active = active;
        }
    }

    /// The bound buffer changed outside the surface
    pub fn document_changed(&mut self, now: Instant) -> bool {
        match &mut self.panel {
            Some(panel) => panel
                .sync
                .document_changed(&panel.binding, &panel.session, now),
            None => false,
        }
    }

    /// Next instant [`PanelManager::tick`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.panel.as_ref()?.sync.next_deadline()
    }

    /// Run expired timers
    pub fn tick(&mut self, now: Instant) -> Cmd {
        match &mut self.panel {
            Some(panel) => panel.sync.poll(now, &panel.binding, &mut panel.session),
            None => Cmd::None,
        }
    }

    /// Parse and route a raw IPC payload. Malformed payloads are dropped.
    pub fn handle_raw(&mut self, raw: &str) -> Cmd {
        match SurfaceMsg::parse(raw) {
            Ok(msg) => self.handle(msg),
            Err(e) => {
                tracing::warn!("Dropping malformed surface message: {}", e);
                Cmd::None
            }
        }
    }

    /// Route one surface message to its handler
    pub fn handle(&mut self, msg: SurfaceMsg) -> Cmd {
        tracing::debug!("Surface message: {}", msg.command());

        // Messages that do not need a bound target
        match msg {
            SurfaceMsg::Info { content } => return Cmd::ShowInfo(content),
            SurfaceMsg::Error { content } => return Cmd::ShowError(content),
            SurfaceMsg::Unknown => {
                tracing::debug!("Ignoring unrecognized surface command");
                return Cmd::None;
            }
            SurfaceMsg::SaveOptions { options } => {
                self.options.replace(options);
                if let Some(panel) = &self.panel {
                    self.options
                        .record_mode(panel.mode.is_source(), panel.mode.rich_mode());
                }
                return Cmd::None;
            }
            SurfaceMsg::ResetConfig => {
                self.options.reset();
                tracing::info!("Surface options reset");
                return Cmd::None;
            }
            _ => {}
        }

        let Self {
            config,
            options,
            workspace_root,
            panel,
            ..
        } = self;
        let Some(panel) = panel.as_mut() else {
            tracing::error!("{} with no bound target", msg.command());
            return Cmd::error(NO_TARGET);
        };

        match msg {
            SurfaceMsg::Ready => on_ready(panel, options, config),
            SurfaceMsg::EngineReady => on_engine_ready(panel, options),
            SurfaceMsg::Edit { content, revision } => {
                match panel
                    .sync
                    .apply_edit(&mut panel.binding, &mut panel.session, content, revision)
                {
                    Ok((_, cmd)) => cmd,
                    Err(e) => {
                        tracing::warn!("Edit failed: {}", e);
                        Cmd::error(e.user_message())
                    }
                }
            }
            SurfaceMsg::Save { content } => {
                match panel
                    .sync
                    .save(&mut panel.binding, &mut panel.session, content)
                {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        tracing::warn!("Save failed: {}", e);
                        Cmd::error(e.user_message())
                    }
                }
            }
            SurfaceMsg::Upload { files } => {
                on_upload(panel, config, workspace_root.as_deref(), &files)
            }
            SurfaceMsg::OpenLink { href } => on_open_link(panel, workspace_root.as_deref(), &href),
            SurfaceMsg::SourceMode { action, target } => {
                let content = panel.session.last_content.clone();
                let transition = match action {
                    SourceAction::Enter => panel.mode.enter(&content),
                    SourceAction::Exit => panel.mode.exit(target, &content),
                    SourceAction::Toggle => panel.mode.toggle(&content),
                };
                apply_transition(panel, options, transition)
            }
            SurfaceMsg::ModeSelected { mode } => {
                match panel.mode.select_rich(mode) {
                    Some(transition) => apply_transition(panel, options, Some(transition)),
                    None => {
                        options.record_mode(false, mode);
                        Cmd::None
                    }
                }
            }
            SurfaceMsg::Info { .. }
            | SurfaceMsg::Error { .. }
            | SurfaceMsg::Unknown
            | SurfaceMsg::SaveOptions { .. }
            | SurfaceMsg::ResetConfig => Cmd::None,
        }
    }
}

/// Send the initial content. The engine is built from the `init` update.
///
/// A reloaded page starts over in its default renderer, so the mode state
/// starts over too.
fn on_ready(panel: &mut Panel, options: &OptionsStore, config: &SurfaceConfig) -> Cmd {
    let content = match panel.binding.text() {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", panel.path().display(), e);
            return Cmd::error(format!(
                "Failed to read {}: {}",
                display_name(panel.path()),
                e
            ));
        }
    };
    let revision = panel.binding.document().map_or(0, Document::revision);
    panel.mode = ModeMachine::new(options.rich_mode().unwrap_or_default(), config.preview_mode);
    panel.session.ready = true;
    panel.session.last_content = content.clone();

    Cmd::Post(HostMsg::init(content, revision, options.options().clone(), config.theme))
}

/// Restore source mode once the engine has built its renderers, if the last
/// session ended in it
fn on_engine_ready(panel: &mut Panel, options: &OptionsStore) -> Cmd {
    if !panel.session.ready {
        tracing::debug!("Engine ready before the ready handshake, ignoring");
        return Cmd::None;
    }
    if !options.source_mode_requested() {
        return Cmd::None;
    }
    tracing::info!("Restoring source mode");
    match panel.mode.enter(&panel.session.last_content) {
        Some(transition) => Cmd::Post(HostMsg::Mode {
            directives: transition.directives,
        }),
        None => Cmd::None,
    }
}

fn apply_transition(panel: &Panel, options: &mut OptionsStore, transition: Option<Transition>) -> Cmd {
    let Some(transition) = transition else {
        return Cmd::None;
    };
    if transition.persist {
        options.record_mode(panel.mode.is_source(), panel.mode.rich_mode());
    }
    Cmd::Post(HostMsg::Mode {
        directives: transition.directives,
    })
}

fn on_upload(
    panel: &Panel,
    config: &SurfaceConfig,
    workspace_root: Option<&Path>,
    files: &[crate::messages::UploadFile],
) -> Cmd {
    let document_path = panel.path();
    let dest = match resolve_upload_dir(&config.image_save_folder, document_path, workspace_root) {
        Ok(dest) => dest,
        Err(e) => {
            tracing::warn!("Upload rejected: {}", e);
            return Cmd::error(e.user_message());
        }
    };

    let report = save_uploads(files, &dest);
    let base = document_path.parent().unwrap_or_else(|| Path::new(""));
    let mut cmds: Vec<Cmd> = report
        .errors
        .iter()
        .map(|e| Cmd::error(e.user_message()))
        .collect();
    if !report.written.is_empty() {
        cmds.insert(
            0,
            Cmd::Post(HostMsg::Uploaded {
                files: report
                    .written
                    .iter()
                    .map(|path| markdown_relative(base, path))
                    .collect(),
            }),
        );
    }
    Cmd::batch(cmds)
}

fn on_open_link(panel: &Panel, workspace_root: Option<&Path>, href: &str) -> Cmd {
    match resolve_link(href, panel.path(), workspace_root) {
        Ok(LinkTarget::External(url)) => Cmd::OpenUrl(url),
        Ok(LinkTarget::Local(path)) if is_markdown_file(&path) => Cmd::OpenFile(path),
        Ok(LinkTarget::Local(path)) => Cmd::OpenPath(path),
        Ok(LinkTarget::Anchor) => Cmd::None,
        Err(e) => {
            tracing::warn!("Link {} rejected: {}", href, e);
            Cmd::error(e.user_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::OptionsMap;
    use crate::mode::EngineDirective;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn manager() -> PanelManager {
        PanelManager::new(
            SurfaceConfig::default(),
            OptionsStore::in_memory(),
            Some(PathBuf::from("/ws")),
        )
    }

    fn buffer(path: &str, text: &str) -> Binding {
        Binding::Buffer(Document::with_text(path, text))
    }

    #[test]
    fn test_open_same_target_reveals() {
        let mut pm = manager();
        let (first, cmd) = pm.open(buffer("/ws/a.md", "x"));
        assert_eq!(first, OpenOutcome::Created { replaced: false });
        assert_eq!(cmd, Cmd::SetTitle("a.md".to_string()));

        let (second, cmd) = pm.open(buffer("/ws/a.md", "x"));
        assert_eq!(second, OpenOutcome::Revealed);
        assert_eq!(cmd, Cmd::Reveal);
    }

    #[test]
    fn test_open_other_target_disposes_previous_first() {
        let released = Rc::new(Cell::new(false));
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        let flag = Rc::clone(&released);
        assert!(pm.subscribe("changes", move || flag.set(true)));

        let (outcome, _) = pm.open(buffer("/ws/b.md", "y"));
        assert_eq!(outcome, OpenOutcome::Created { replaced: true });
        assert!(released.get());
        assert_eq!(pm.panel().unwrap().path(), Path::new("/ws/b.md"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        assert!(pm.close(DisposeReason::SelfClosed));
        assert!(!pm.close(DisposeReason::Closed));
        assert!(!pm.document_closed(Path::new("/ws/a.md")));
    }

    #[test]
    fn test_ready_sends_init() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "# Title"));

        let cmd = pm.handle(SurfaceMsg::Ready);
        assert_eq!(
            cmd,
            Cmd::Post(HostMsg::init(
                "# Title".to_string(),
                0,
                OptionsMap::new(),
                Default::default()
            ))
        );
        assert!(pm.panel().unwrap().session.ready);
    }

    #[test]
    fn test_ready_restores_source_mode() {
        let mut options = OptionsStore::in_memory();
        options.record_mode(true, crate::mode::RichMode::Wysiwyg);
        let mut pm = PanelManager::new(SurfaceConfig::default(), options, None);
        pm.open(buffer("/ws/a.md", "body"));

        // Nothing is restored until the engine has built its renderers
        assert!(matches!(
            pm.handle(SurfaceMsg::Ready),
            Cmd::Post(HostMsg::Update { .. })
        ));
        assert!(!pm.panel().unwrap().mode.is_source());

        let cmd = pm.handle(SurfaceMsg::EngineReady);
        let Cmd::Post(HostMsg::Mode { directives }) = &cmd else {
            panic!("expected mode directives, got {:?}", cmd);
        };
        assert!(directives.contains(&EngineDirective::SetValue {
            content: "body".to_string()
        }));
        let panel = pm.panel().unwrap();
        assert!(panel.mode.is_source());
        assert_eq!(panel.mode.previous_rich(), Some(crate::mode::RichMode::Wysiwyg));
    }

    #[test]
    fn test_engine_ready_before_handshake_is_ignored() {
        let mut options = OptionsStore::in_memory();
        options.record_mode(true, crate::mode::RichMode::Ir);
        let mut pm = PanelManager::new(SurfaceConfig::default(), options, None);
        pm.open(buffer("/ws/a.md", "body"));

        assert_eq!(pm.handle(SurfaceMsg::EngineReady), Cmd::None);
        assert!(!pm.panel().unwrap().mode.is_source());
    }

    #[test]
    fn test_new_panel_inherits_host_focus() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        pm.set_active(true);

        pm.open(buffer("/ws/b.md", "y"));
        assert!(pm.panel().unwrap().session.active);

        pm.set_active(false);
        pm.open(buffer("/ws/c.md", "z"));
        assert!(!pm.panel().unwrap().session.active);
    }

    #[test]
    fn test_messages_without_target() {
        let mut pm = manager();
        assert_eq!(
            pm.handle(SurfaceMsg::Info {
                content: "hi".to_string()
            }),
            Cmd::ShowInfo("hi".to_string())
        );
        assert!(matches!(pm.handle(SurfaceMsg::Ready), Cmd::ShowError(_)));
        assert_eq!(pm.handle(SurfaceMsg::Unknown), Cmd::None);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        assert_eq!(pm.handle_raw("{not json"), Cmd::None);
        assert_eq!(pm.handle_raw(r#"{"command":"edit"}"#), Cmd::None);
    }

    #[test]
    fn test_open_link_outside_root_is_refused() {
        let mut pm = manager();
        pm.open(buffer("/ws/docs/a.md", "x"));

        let cmd = pm.handle(SurfaceMsg::OpenLink {
            href: "../../etc/passwd".to_string(),
        });
        assert!(matches!(cmd, Cmd::ShowError(_)));

        let cmd = pm.handle(SurfaceMsg::OpenLink {
            href: "../README.md#intro".to_string(),
        });
        assert_eq!(cmd, Cmd::OpenFile(PathBuf::from("/ws/README.md")));

        let cmd = pm.handle(SurfaceMsg::OpenLink {
            href: "assets/diagram.png".to_string(),
        });
        assert_eq!(cmd, Cmd::OpenPath(PathBuf::from("/ws/docs/assets/diagram.png")));

        let cmd = pm.handle(SurfaceMsg::OpenLink {
            href: "https://example.com".to_string(),
        });
        assert_eq!(cmd, Cmd::OpenUrl("https://example.com".to_string()));

        assert_eq!(
            pm.handle(SurfaceMsg::OpenLink {
                href: "#top".to_string()
            }),
            Cmd::None
        );
    }

    #[test]
    fn test_source_toggle_persists_mode() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        pm.handle(SurfaceMsg::Ready);

        let cmd = pm.handle(SurfaceMsg::SourceMode {
            action: SourceAction::Toggle,
            target: None,
        });
        assert!(matches!(cmd, Cmd::Post(HostMsg::Mode { .. })));
        assert!(pm.options().source_mode_requested());

        // Entering twice is a no-op
        let cmd = pm.handle(SurfaceMsg::SourceMode {
            action: SourceAction::Enter,
            target: None,
        });
        assert_eq!(cmd, Cmd::None);

        pm.handle(SurfaceMsg::ModeSelected {
            mode: crate::mode::RichMode::Sv,
        });
        assert!(!pm.options().source_mode_requested());
        assert_eq!(pm.options().rich_mode(), Some(crate::mode::RichMode::Sv));
    }

    #[test]
    fn test_external_change_pushed_after_debounce() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        let now = Instant::now();

        pm.document_mut().unwrap().replace_all("changed");
        assert!(pm.document_changed(now));
        assert_eq!(pm.tick(now), Cmd::None);
        let deadline = pm.next_deadline().unwrap();

        let cmds = pm.tick(deadline).flatten();
        assert!(cmds.contains(&Cmd::Post(HostMsg::update("changed".to_string(), 1))));
        assert_eq!(pm.next_deadline(), None);
    }

    #[test]
    fn test_disposed_panel_ignores_timers() {
        let mut pm = manager();
        pm.open(buffer("/ws/a.md", "x"));
        let now = Instant::now();
        pm.document_mut().unwrap().replace_all("changed");
        pm.document_changed(now);

        pm.close(DisposeReason::Closed);
        assert_eq!(pm.next_deadline(), None);
        assert_eq!(pm.tick(now + Duration::from_secs(1)), Cmd::None);
    }
}
