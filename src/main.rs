//! nanoKONTROL GW - Rust implementation
//!
//! Gateway driving a DAW host from a Korg nanoKONTROL Studio control surface.

use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nanokontrol_gw::config::AppConfig;
use nanokontrol_gw::control_map::{ControlIdentity, ControlMap};
use nanokontrol_gw::device::{discovery, NanoKontrolDevice};
use nanokontrol_gw::host::ConsoleHost;
use nanokontrol_gw::surface::Surface;

/// nanoKONTROL Gateway - Drive a DAW from a Korg nanoKONTROL Studio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print the control map and exit
    #[arg(long)]
    test_mappings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting nanoKONTROL GW v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load_or_default(&args.config).await?;

    if args.list_ports {
        discovery::print_ports(&config.midi);
        return Ok(());
    }

    if args.test_mappings {
        test_control_mappings()?;
        return Ok(());
    }

    run_app(config, shutdown_signal()).await?;

    info!("nanoKONTROL GW shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    // Fail early with a readable error instead of a panic on first use
    ControlMap::new()?;

    let mut device = NanoKontrolDevice::new(&config.midi);
    device.connect()?;

    let output = device
        .output()
        .ok_or_else(|| anyhow!("nanoKONTROL output is not connected"))?;
    let mut device_rx = device
        .take_event_receiver()
        .ok_or_else(|| anyhow!("Failed to get nanoKONTROL event receiver"))?;

    let mut host = ConsoleHost::new("console");
    let mut surface = Surface::new(output);

    // Bring the LEDs in line with the host before the first event
    surface.sync_from_host(&host);
    surface.flush();
    info!("✅ Surface initialized in {}", surface.mode());

    let mut keepalive = interval(config.timing.keepalive_interval());
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut flush = interval(config.timing.flush_interval());
    flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Ready to process MIDI events!");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = device_rx.recv() => {
                debug!("Received nanoKONTROL event: raw={:02X?}", event.raw_data);

                surface.on_midi(&event.raw_data, &mut host);

                for change in host.take_changes() {
                    surface.on_host_state(&change);
                }
            }

            _ = keepalive.tick() => {
                if let Err(e) = surface.send_keepalive() {
                    warn!("Keepalive failed: {:#}", e);
                }
            }

            _ = flush.tick() => {
                surface.flush();
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    device.disconnect();

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

fn test_control_mappings() -> Result<()> {
    use colored::*;

    println!("\n{}", "=== nanoKONTROL Control Map ===".bold().cyan());

    let map = ControlMap::new()?;
    let entries: Vec<_> = map.entries().collect();

    println!("\n{}", "Loaded Mappings:".bold());
    println!("  Total controls: {}", entries.len().to_string().green());
    println!("  LEDs: {}", map.led_ccs().len().to_string().green());

    println!("\n{}", "By CC:".bold());
    for (cc, identity) in &entries {
        let kind = match identity {
            ControlIdentity::Utility(_) => "button".yellow(),
            ControlIdentity::Jog(_) => "jog".magenta(),
            ControlIdentity::Channel { control, .. } => {
                format!("{:?}", control.kind()).to_lowercase().yellow()
            },
        };
        println!("  CC {:>3} -> {} ({})", cc, identity.to_string().bright_white(), kind);
    }

    println!("\n{}", "Reverse Lookup Test:".bold());
    for (cc, identity) in &entries {
        let event = map.map_to_control_event(*cc, 127);
        debug!("CC {} -> {:?}", cc, event);
        if map.identity(*cc) != Some(*identity) {
            return Err(anyhow!("CC {} does not resolve back to {}", cc, identity));
        }
    }
    println!("  {} controls resolve back to their CC", entries.len().to_string().green());

    println!("\n{}", "✅ Control mapping test complete!".green().bold());

    Ok(())
}
