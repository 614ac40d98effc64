//! Command-line argument parsing
//!
//! Supports:
//! - Opening one markdown file, as a buffer or a raw file reference
//! - An explicit workspace root, or detection from the nearest `.git`
//! - A theme override for the surface

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::messages::ThemeHint;

/// A rich markdown editing surface
#[derive(Parser, Debug)]
#[command(name = "md-surface", version, about = "A rich markdown editing surface")]
pub struct CliArgs {
    /// Markdown file to open
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Workspace root; surface paths may not leave it
    #[arg(short = 'w', long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Bind the file directly instead of loading it into a buffer
    #[arg(long)]
    pub raw: bool,

    /// Override the configured surface theme
    #[arg(long, value_enum)]
    pub theme: Option<ThemeArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for ThemeHint {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => ThemeHint::Dark,
            ThemeArg::Light => ThemeHint::Light,
        }
    }
}

/// What to open, resolved from the arguments
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Absolute path of the file to bind
    pub file: PathBuf,
    pub workspace_root: Option<PathBuf>,
    pub raw: bool,
    pub theme: Option<ThemeHint>,
}

impl CliArgs {
    /// Convert parsed CLI args into startup configuration
    pub fn into_config(self) -> Result<StartupConfig, String> {
        let cwd = std::env::current_dir()
            .map_err(|e| format!("Cannot determine working directory: {}", e))?;
        self.into_config_from(&cwd)
    }

    /// Same as [`CliArgs::into_config`], resolving relative paths against `cwd`
    pub fn into_config_from(self, cwd: &Path) -> Result<StartupConfig, String> {
        let file = crate::sanitize::normalize(&cwd.join(&self.file));
        if file.is_dir() {
            return Err(format!("{} is a directory", file.display()));
        }

        let workspace_root = match self.workspace {
            Some(dir) => {
                let dir = crate::sanitize::normalize(&cwd.join(dir));
                if !dir.is_dir() {
                    return Err(format!("Workspace {} is not a directory", dir.display()));
                }
                if !crate::sanitize::is_contained(&file, &dir) {
                    return Err(format!(
                        "{} is not inside workspace {}",
                        file.display(),
                        dir.display()
                    ));
                }
                Some(dir)
            }
            None => detect_workspace(&file),
        };

        Ok(StartupConfig {
            file,
            workspace_root,
            raw: self.raw,
            theme: self.theme.map(ThemeHint::from),
        })
    }
}

/// Nearest ancestor of `file` containing a `.git` entry
pub fn detect_workspace(file: &Path) -> Option<PathBuf> {
    file.ancestors()
        .skip(1)
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}
