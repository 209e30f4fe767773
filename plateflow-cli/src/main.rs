use anyhow::Result;
use clap::Parser;
use plateflow_core::settings::{Settings, SettingsManager};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod manifest;
mod replay;

use crate::manifest::Manifest;
use crate::replay::Replay;

#[derive(Parser, Debug)]
#[command(name = "plateflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replays a file session and reports which workflows consume which files")]
struct Args {
    /// Session manifest (.toml or .json)
    manifest: PathBuf,

    /// Settings file to use instead of ~/.plateflow/settings.toml
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Log at debug level regardless of the configured filter
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings_manager = match &args.settings {
        Some(path) => SettingsManager::from_path(path.clone())?,
        None => SettingsManager::new()?,
    };
    let settings = settings_manager.settings();
    setup_tracing(&settings, args.verbose);

    info!(
        "CLI startup: manifest={:?}, settings={:?}",
        args.manifest,
        settings_manager.path()
    );

    let manifest = Manifest::load(&args.manifest)?;
    let mut replay = Replay::new(&settings);
    let result = replay.run(&manifest);

    println!("Events:");
    for event in replay.take_events() {
        println!("  {event}");
    }
    result?;

    println!();
    println!("Active files:");
    for line in replay.active_summary()?.lines() {
        println!("  {line}");
    }
    Ok(())
}

/// Logs go to stderr so the report on stdout stays clean. `RUST_LOG` wins over
/// the settings file.
fn setup_tracing(settings: &Settings, verbose: bool) {
    use tracing_subscriber::fmt;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
}
