//! pedal-mapper daemon
//!
//! Reads the Stream Deck Pedal over HID and types the bound key combos on a
//! virtual keyboard.

mod bindings;
mod disambiguator;
mod edge;
mod emitter;
mod hid;
mod injector;
mod logging;
mod mapper;
mod poller;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pedal_mapper_config::Config;
use tokio::sync::mpsc;

use crate::bindings::BindingTable;
use crate::disambiguator::DEBOUNCE_DELAY;
use crate::edge::EdgeDetector;
use crate::hid::PedalDevice;
use crate::injector::VirtualDevice;
use crate::mapper::PedalMapper;

#[derive(Parser, Debug)]
#[command(name = "pedal-mapperd")]
#[command(about = "Foot pedal to keyboard mapping daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/pedal-mapper/config.kdl")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let log = logging::init();
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();
    let config = load_config(&config_path)?;
    log.apply(config.global.log_level)?;

    let pedal = PedalDevice::open(config.pedal.vendor_id, config.pedal.product_id)?;

    let bindings = BindingTable::stream_deck_pedal();
    let keyboard =
        VirtualDevice::new_keyboard(&config.pedal.virtual_device_name, &bindings.capabilities())?;

    let (press_tx, mut press_rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));

    let poll_interval = Duration::from_millis(config.global.poll_interval_ms);
    let poller = {
        let stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || {
            let mut pedal = pedal;
            let mut detector = EdgeDetector::new();
            poller::poll_pedal(&mut pedal, &mut detector, poll_interval, &press_tx, &stop)
        })
    };

    tracing::info!(
        "pedal-mapper daemon running for {}",
        config.pedal.vendor_product()
    );

    let mut mapper = PedalMapper::new(bindings, keyboard, DEBOUNCE_DELAY);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let result = mapper.run(&mut press_rx, shutdown).await;

    tracing::info!("Shutting down...");

    stop.store(true, Ordering::Relaxed);
    // Unblocks a poller waiting to deliver a press
    drop(press_rx);
    if let Err(e) = mapper.release_held() {
        tracing::warn!("{:#}", e);
    }
    result?;

    poller
        .await
        .context("Pedal poller panicked")?
        .context("Lost connection to pedal")?;

    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &std::path::Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "No configuration at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    tracing::info!("Loading configuration from {}", path.display());
    let config = pedal_mapper_config::parse_config(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    tracing::info!(
        "Loaded configuration for pedal {}",
        config.pedal.vendor_product()
    );

    Ok(config)
}
