//! Persisted surface options
//!
//! The surface owns the contents of the options blob; the host only stores it
//! and hands it back verbatim in the `init` update. It lives in
//! `~/.config/md-surface/state.json` under a fixed key so other keys in the
//! file survive.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::messages::OptionsMap;
use crate::mode::RichMode;

/// Key the options blob is stored under
pub const OPTIONS_KEY: &str = "md-surface.options";

/// Key inside the blob recording whether source mode was active
pub const SOURCE_MODE_KEY: &str = "sourceMode";

/// Key inside the blob recording the last rich mode
pub const MODE_KEY: &str = "mode";

/// Options blob plus where it is persisted
#[derive(Debug, Clone, Default)]
pub struct OptionsStore {
    /// `None` keeps everything in memory (tests, no config dir)
    path: Option<PathBuf>,
    options: OptionsMap,
}

impl OptionsStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from the default state file
    pub fn load() -> Self {
        match crate::config_paths::state_file() {
            Some(path) => Self::load_from(path),
            None => Self::in_memory(),
        }
    }

    /// Load from a specific state file; missing or unreadable files start empty
    pub fn load_from(path: PathBuf) -> Self {
        let options = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str::<OptionsMap>(&contents).ok())
            .and_then(|mut state| match state.remove(OPTIONS_KEY) {
                Some(Value::Object(options)) => Some(options),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            path: Some(path),
            options,
        }
    }

    pub fn options(&self) -> &OptionsMap {
        &self.options
    }

    /// Replace the blob (surface `save-options`)
    pub fn replace(&mut self, options: OptionsMap) {
        self.options = options;
        self.persist();
    }

    /// Forget everything (surface `reset-config`)
    pub fn reset(&mut self) {
        self.options.clear();
        self.persist();
    }

    /// Record mode state alongside the surface's own options
    pub fn record_mode(&mut self, source_mode: bool, rich: RichMode) {
        self.options
            .insert(SOURCE_MODE_KEY.to_string(), Value::Bool(source_mode));
        if let Ok(mode) = serde_json::to_value(rich) {
            self.options.insert(MODE_KEY.to_string(), mode);
        }
        self.persist();
    }

    /// Whether a previous session ended in source mode
    pub fn source_mode_requested(&self) -> bool {
        matches!(self.options.get(SOURCE_MODE_KEY), Some(Value::Bool(true)))
    }

    /// Rich mode a previous session ended in
    pub fn rich_mode(&self) -> Option<RichMode> {
        self.options
            .get(MODE_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.write(path) {
            tracing::warn!("Failed to persist options to {}: {}", path.display(), e);
        }
    }

    fn write(&self, path: &Path) -> std::io::Result<()> {
        // Keep unrelated keys written by other instances
        let mut state: OptionsMap = std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        state.insert(OPTIONS_KEY.to_string(), Value::Object(self.options.clone()));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&state)?;
        std::fs::write(path, contents)
    }
}
