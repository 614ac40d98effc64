//! Message protocol between the host and the rendering surface
//!
//! Both directions are JSON objects discriminated by a `command` tag.

use serde::{Deserialize, Serialize};

use crate::mode::{EngineDirective, RichMode};

/// Opaque options blob owned by the surface
pub type OptionsMap = serde_json::Map<String, serde_json::Value>;

/// Light/dark hint for the surface's own theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeHint {
    #[default]
    Dark,
    Light,
}

/// A file dropped or pasted into the surface
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadFile {
    pub name: String,
    /// File contents, base64 encoded
    pub base64: String,
}

/// What to do with source mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceAction {
    Enter,
    Exit,
    Toggle,
}

/// Messages sent by the surface
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum SurfaceMsg {
    /// Surface finished loading and can receive content
    Ready,
    /// Engine built its renderers from the `init` update
    EngineReady,
    /// Surface changed its own options
    SaveOptions { options: OptionsMap },
    /// Informational message to show the user
    Info { content: String },
    /// Error message to show the user
    Error { content: String },
    /// Full text of the surface after a user edit
    Edit {
        content: String,
        /// Revision of the last update the edit is based on
        #[serde(default)]
        revision: Option<u64>,
    },
    /// Forget persisted options
    ResetConfig,
    /// Persist the buffer to disk, optionally with the surface's final text
    Save {
        #[serde(default)]
        content: Option<String>,
    },
    /// Write dropped/pasted files next to the document
    Upload { files: Vec<UploadFile> },
    /// A link was clicked
    OpenLink { href: String },
    /// Source mode button or shortcut
    SourceMode {
        action: SourceAction,
        #[serde(default)]
        target: Option<RichMode>,
    },
    /// One of the rich mode buttons was clicked
    ModeSelected { mode: RichMode },
    /// Any tag this host does not know about
    #[serde(other)]
    Unknown,
}

impl SurfaceMsg {
    /// Parse a raw IPC payload
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Command tag, for logging
    pub fn command(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::EngineReady => "engine-ready",
            Self::SaveOptions { .. } => "save-options",
            Self::Info { .. } => "info",
            Self::Error { .. } => "error",
            Self::Edit { .. } => "edit",
            Self::ResetConfig => "reset-config",
            Self::Save { .. } => "save",
            Self::Upload { .. } => "upload",
            Self::OpenLink { .. } => "open-link",
            Self::SourceMode { .. } => "source-mode",
            Self::ModeSelected { .. } => "mode-selected",
            Self::Unknown => "unknown",
        }
    }
}

/// Flavor of an update message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// First content after `ready`; carries options and theme
    Init,
    Update,
}

/// Messages sent to the surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum HostMsg {
    Update {
        content: String,
        #[serde(rename = "type")]
        kind: UpdateKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<OptionsMap>,
        #[serde(skip_serializing_if = "Option::is_none")]
        theme: Option<ThemeHint>,
        /// Buffer revision the content was taken from
        revision: u64,
    },
    /// Markdown-relative paths of files written for an upload
    Uploaded { files: Vec<String> },
    /// Engine directives produced by a mode switch
    Mode { directives: Vec<EngineDirective> },
}

impl HostMsg {
    pub fn update(content: String, revision: u64) -> Self {
        Self::Update {
            content,
            kind: UpdateKind::Update,
            options: None,
            theme: None,
            revision,
        }
    }

    pub fn init(content: String, revision: u64, options: OptionsMap, theme: ThemeHint) -> Self {
        Self::Update {
            content,
            kind: UpdateKind::Init,
            options: Some(options),
            theme: Some(theme),
            revision,
        }
    }

    pub fn to_json(&self) -> String {
        // Only string keys and plain data; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
