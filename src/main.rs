mod ai;
mod app;
mod config;
mod engine;
mod history;
mod network;
mod sim;
mod util;
mod view;

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::view::LayoutMode;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// LinkedIn-style `Connections.csv` export.
    connections: PathBuf,

    /// Optional `Profile.csv` describing the owner.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Name shown on the owner node when no profile is given.
    #[arg(long, default_value = "")]
    owner_name: String,

    /// Config file to use instead of the one in the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `default_layout` from the config.
    #[arg(long)]
    layout: Option<LayoutMode>,
}

fn load_config(path: Option<&PathBuf>) -> Config {
    let path = match path {
        Some(path) => Ok(path.clone()),
        None => Config::default_path(),
    };
    match path.and_then(|path| Config::load_from(&path)) {
        Ok(config) => config,
        Err(error) => {
            log::warn!("{error:#}; using default settings");
            Config::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_ref());
    if let Some(layout) = args.layout {
        config.default_layout = layout;
    }

    let request = app::LoadRequest {
        connections: args.connections,
        profile: args.profile,
        owner_name: args.owner_name,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "constellate",
        options,
        Box::new(move |cc| Ok(Box::new(app::ConstellateApp::new(cc, request, config)))),
    )
}
