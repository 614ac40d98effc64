//! Runtime module - winit/wry platform integration
//!
//! This module contains the platform glue for running the surface:
//! - `app` - ApplicationHandler, window management and command execution
//! - `webview` - the wry webview hosting the rendering surface

pub mod app;
pub mod webview;

pub use app::{App, UserEvent};
