use std::path::PathBuf;

use air_quality_dashboard::app::DashboardApp;
use air_quality_dashboard::config::DashboardConfig;
use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset to open, overriding `data_path` from the config.
    data: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run() {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Cli::parse();
    log::debug!("{args:?}");

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path).context("failed to load config")?,
        None => DashboardConfig::default(),
    };
    if let Some(data) = args.data {
        config.data_path = data;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Air Quality Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(&config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("failed to run the dashboard window")
}
