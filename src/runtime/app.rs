use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoopProxy};
use winit::window::Window;

use md_surface::cli::StartupConfig;
use md_surface::commands::Cmd;
use md_surface::document::display_name;
use md_surface::fs_watcher::{FileEvent, FileWatcher};
use md_surface::panel::{DisposeReason, OpenOutcome, PanelManager};

use super::webview::SurfaceWebview;

/// How often the file watcher is drained while idle
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Events sent to the event loop from outside winit
#[derive(Debug, Clone)]
pub enum UserEvent {
    /// Raw JSON posted by a surface webview
    Ipc { generation: u64, body: String },
}

pub struct App {
    manager: PanelManager,
    startup: StartupConfig,
    proxy: EventLoopProxy<UserEvent>,
    window: Option<Rc<Window>>,
    /// Released by the panel's subscriptions when the panel is disposed
    webview: Rc<RefCell<Option<SurfaceWebview>>>,
    watcher: Rc<RefCell<Option<FileWatcher>>>,
    /// Generation of the current webview; IPC from older ones is dropped
    generation: u64,
}

impl App {
    pub fn new(manager: PanelManager, startup: StartupConfig, proxy: EventLoopProxy<UserEvent>) -> Self {
        Self {
            manager,
            startup,
            proxy,
            window: None,
            webview: Rc::new(RefCell::new(None)),
            watcher: Rc::new(RefCell::new(None)),
            generation: 0,
        }
    }

    /// Open `path` in the panel, creating a fresh webview when the target changed
    fn bind(&mut self, path: PathBuf) -> Result<(), String> {
        let (outcome, cmd) = self
            .manager
            .open_path(&path, self.startup.raw)
            .map_err(|e| e.user_message())?;

        if let OpenOutcome::Created { .. } = outcome {
            self.attach_surface(&path)?;
        }
        self.process_cmd(cmd);
        Ok(())
    }

    fn attach_surface(&mut self, path: &std::path::Path) -> Result<(), String> {
        let Some(window) = self.window.clone() else {
            return Err("No window to attach the surface to".to_string());
        };

        self.generation += 1;
        let webview = SurfaceWebview::new(
            &window,
            &self.manager.surface_html(),
            self.proxy.clone(),
            self.generation,
        )
        .map_err(|e| format!("Failed to create surface: {}", e))?;
        *self.webview.borrow_mut() = Some(webview);
        let slot = Rc::clone(&self.webview);
        self.manager.subscribe("surface", move || {
            slot.borrow_mut().take();
        });
        // A rebind keeps the window focused, so no focus event will follow
        self.manager.set_active(window.has_focus());

        if self.manager.panel().is_some_and(|p| p.binding.document().is_some()) {
            match FileWatcher::new(path.to_path_buf()) {
                Ok(watcher) => {
                    *self.watcher.borrow_mut() = Some(watcher);
                    let slot = Rc::clone(&self.watcher);
                    self.manager.subscribe("file-watcher", move || {
                        slot.borrow_mut().take();
                    });
                }
                Err(e) => tracing::warn!("Not watching {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    fn process_cmd(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::None => {}
            Cmd::Post(msg) => {
                if let Some(webview) = self.webview.borrow().as_ref() {
                    webview.post(&msg);
                }
            }
            Cmd::SetTitle(title) => {
                if let Some(window) = &self.window {
                    window.set_title(&title);
                }
            }
            Cmd::ShowInfo(message) => {
                tracing::info!("{}", message);
            }
            Cmd::ShowError(message) => {
                tracing::warn!("{}", message);
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("md-surface")
                    .set_description(&message)
                    .set_buttons(rfd::MessageButtons::Ok)
                    .show();
            }
            Cmd::OpenUrl(url) => {
                if let Err(e) = open::that(&url) {
                    tracing::warn!("Failed to open {}: {}", url, e);
                }
            }
            Cmd::OpenPath(path) => {
                if let Err(e) = open::that(&path) {
                    tracing::warn!("Failed to open {}: {}", path.display(), e);
                }
            }
            Cmd::OpenFile(path) => {
                if let Err(message) = self.bind(path) {
                    self.process_cmd(Cmd::ShowError(message));
                }
            }
            Cmd::Reveal => {
                if let Some(window) = &self.window {
                    window.focus_window();
                }
                if let Some(webview) = self.webview.borrow().as_ref() {
                    webview.focus();
                }
            }
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.process_cmd(cmd);
                }
            }
        }
    }

    /// Reload the buffer if the file changed on disk and nothing is unsaved.
    /// Returns true if the panel was closed because its file went away.
    fn poll_watcher(&mut self, now: Instant) -> bool {
        let event = self.watcher.borrow().as_ref().and_then(FileWatcher::poll);
        let Some(event) = event else {
            return false;
        };

        let Some(doc) = self.manager.document_mut() else {
            return false;
        };
        if doc.is_dirty() {
            tracing::warn!(
                "{} changed on disk but has unsaved edits, keeping the buffer",
                doc.path.display()
            );
            return false;
        }

        match event {
            FileEvent::Changed => {
                match doc.reload() {
                    Ok(true) => {
                        self.manager.document_changed(now);
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Failed to reload {}: {}", doc.path.display(), e),
                }
                false
            }
            FileEvent::Removed => {
                let path = doc.path.clone();
                self.manager.document_closed(&path);
                self.process_cmd(Cmd::ShowError(format!(
                    "{} was moved or deleted",
                    display_name(&path)
                )));
                true
            }
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("md-surface")
            .with_inner_size(LogicalSize::new(960, 720));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Rc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window);

        let file = self.startup.file.clone();
        if let Err(message) = self.bind(file) {
            tracing::error!("{}", message);
            self.process_cmd(Cmd::ShowError(message));
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::Ipc { generation, body } => {
                if generation != self.generation {
                    tracing::debug!("Dropping message from disposed surface {}", generation);
                    return;
                }
                let cmd = self.manager.handle_raw(&body);
                self.process_cmd(cmd);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.manager.close(DisposeReason::SelfClosed);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(webview) = self.webview.borrow().as_ref() {
                    webview.resize(size);
                }
            }
            WindowEvent::Focused(focused) => {
                self.manager.set_active(focused);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.manager.close(DisposeReason::Closed);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if self.poll_watcher(now) {
            event_loop.exit();
            return;
        }

        let cmd = self.manager.tick(now);
        self.process_cmd(cmd);

        let mut wake = now + WATCH_POLL_INTERVAL;
        if let Some(deadline) = self.manager.next_deadline() {
            wake = wake.min(deadline);
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(wake));
    }
}
