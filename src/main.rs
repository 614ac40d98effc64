mod runtime;

use anyhow::Result;
use clap::Parser;
use winit::event_loop::EventLoop;

use md_surface::cli::CliArgs;
use md_surface::config::SurfaceConfig;
use md_surface::options::OptionsStore;
use md_surface::panel::PanelManager;

use runtime::{App, UserEvent};

fn main() -> Result<()> {
    md_surface::tracing::init();

    let startup = CliArgs::parse().into_config().map_err(anyhow::Error::msg)?;

    let mut config = SurfaceConfig::load();
    if let Some(theme) = startup.theme {
        config.theme = theme;
    }

    tracing::info!(
        "Starting md-surface for {} (workspace: {:?})",
        startup.file.display(),
        startup.workspace_root
    );

    let manager = PanelManager::new(config, OptionsStore::load(), startup.workspace_root.clone());

    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    let mut app = App::new(manager, startup, event_loop.create_proxy());

    event_loop.run_app(&mut app)?;

    Ok(())
}
