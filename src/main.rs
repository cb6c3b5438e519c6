// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod app;
mod config;
mod export;
mod viewport;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;
use log::{info, warn};

use app::WhatsThatPlaneApp;
use config::{AppConfig, ConfyStore};

#[derive(Parser, Debug)]
#[command(version, about = "Live map of the flights overhead")]
struct Args {
    /// Sensor entity carrying the flight snapshot
    #[arg(short, long)]
    entity: Option<String>,

    /// Host state JSON file to watch
    #[arg(short, long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Seconds between checks of the snapshot file
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Fixed starting hue (0.0 - 1.0) for reproducible flight colors
    #[arg(long)]
    seed: Option<f64>,

    /// Render the snapshot once to a GeoJSON file and exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let stored = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {e}");
        AppConfig::default()
    });
    if let Ok(path) = AppConfig::get_config_path() {
        info!("Configuration file: {}", path.display());
    }
    let config = stored
        .clone()
        .with_overrides(args.entity, args.snapshot, args.poll_secs, args.seed);

    if let Some(output) = args.export {
        export::export_file(&config, &output)?;
        return Ok(());
    }

    info!("Starting What's That Plane...");
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_title("What's That Plane"),
        ..Default::default()
    };

    eframe::run_native(
        "What's That Plane",
        options,
        Box::new(move |cc| {
            Ok(Box::new(WhatsThatPlaneApp::new(
                cc,
                &config,
                ConfyStore::new(stored),
            )))
        }),
    )?;
    Ok(())
}
