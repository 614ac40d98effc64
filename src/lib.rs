//! md-surface - rich markdown editing surface
//!
//! This crate provides the host-side logic for a webview-based markdown
//! editor: the message protocol, buffer/surface synchronization, the editing
//! mode state machine and the trust boundary for paths and style text the
//! surface hands back. Platform glue lives in the binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_paths;
pub mod document;
pub mod file_validation;
pub mod fs_watcher;
pub mod messages;
pub mod mode;
pub mod options;
pub mod page;
pub mod panel;
pub mod sanitize;
pub mod sync;
pub mod tracing;
pub mod upload;

// Re-export commonly used types
pub use commands::Cmd;
pub use config::SurfaceConfig;
pub use document::{Binding, Document};
pub use messages::{HostMsg, SurfaceMsg};
pub use mode::{ModeMachine, RichMode};
pub use options::OptionsStore;
pub use panel::PanelManager;
pub use sync::SyncEngine;
