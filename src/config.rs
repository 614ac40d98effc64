//! Surface configuration
//!
//! Stored in `~/.config/md-surface/config.yaml`. The panel manager only reads
//! it; editing happens outside the surface.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::messages::ThemeHint;
use crate::mode::PreviewMode;

/// Configuration read when a panel is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Derive the surface colors from the host theme instead of the engine's own
    pub use_theme_color: bool,
    /// Upload folder template, resolved against the document's directory.
    /// Supports `${projectRoot}`, `${file}`, `${fileBasenameNoExtension}`, `${dir}`.
    pub image_save_folder: String,
    /// Extra style text injected into the surface (sanitized first)
    pub custom_css: String,
    /// Whether split view shows the preview pane
    pub preview_mode: PreviewMode,
    /// Light/dark hint sent with the initial content
    pub theme: ThemeHint,
    /// Coalescing window for pushing external changes into the surface
    pub debounce_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            use_theme_color: false,
            image_save_folder: "assets".to_string(),
            custom_css: String::new(),
            preview_mode: PreviewMode::default(),
            theme: ThemeHint::default(),
            debounce_ms: crate::sync::DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl SurfaceConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
