//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use md_surface::commands::Cmd;
use md_surface::config::SurfaceConfig;
use md_surface::document::{Binding, Document};
use md_surface::messages::HostMsg;
use md_surface::options::OptionsStore;
use md_surface::panel::PanelManager;
use tempfile::TempDir;

/// Temporary workspace with `notes/a.md` inside it
pub struct Workspace {
    pub dir: TempDir,
    pub root: PathBuf,
    pub doc: PathBuf,
}

impl Workspace {
    pub fn new(text: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path().join("ws");
        std::fs::create_dir_all(root.join("notes")).expect("Failed to create notes dir");
        let doc = root.join("notes").join("a.md");
        std::fs::write(&doc, text).expect("Failed to write document");
        Self { dir, root, doc }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

/// Panel manager over the workspace with in-memory options
pub fn manager(ws: &Workspace) -> PanelManager {
    manager_with(ws, SurfaceConfig::default())
}

pub fn manager_with(ws: &Workspace, config: SurfaceConfig) -> PanelManager {
    PanelManager::new(config, OptionsStore::in_memory(), Some(ws.root.clone()))
}

/// Open the workspace document as a buffer and complete the `ready` handshake
pub fn open_ready(pm: &mut PanelManager, doc: &Path) -> Cmd {
    let text = std::fs::read_to_string(doc).expect("Failed to read document");
    pm.open(Binding::Buffer(Document::with_text(doc, &text)));
    pm.handle_raw(r#"{"command":"ready"}"#)
}

/// Messages posted to the surface, in order
pub fn posts(cmd: Cmd) -> Vec<HostMsg> {
    cmd.flatten()
        .into_iter()
        .filter_map(|c| match c {
            Cmd::Post(msg) => Some(msg),
            _ => None,
        })
        .collect()
}

/// Error texts shown to the user, in order
pub fn errors(cmd: Cmd) -> Vec<String> {
    cmd.flatten()
        .into_iter()
        .filter_map(|c| match c {
            Cmd::ShowError(msg) => Some(msg),
            _ => None,
        })
        .collect()
}

/// JSON for an `edit` message
pub fn edit_json(content: &str, revision: Option<u64>) -> String {
    let mut msg = serde_json::json!({"command": "edit", "content": content});
    if let Some(revision) = revision {
        msg["revision"] = revision.into();
    }
    msg.to_string()
}
