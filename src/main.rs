// src/main.rs
use anyhow::Result;
use eframe::egui;
use tracing_subscriber::EnvFilter;

mod analysis;
mod app;
mod config;
mod data;
mod engine;
mod error;
mod file;
mod models;
mod modules;
mod options;
mod signal;
mod state;
mod ui;

use app::StatDeskApp;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    init_logging();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("StatDesk"),
        ..Default::default()
    };

    eframe::run_native(
        "StatDesk",
        options,
        Box::new(|_cc| Box::new(StatDeskApp::new())),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))
}
