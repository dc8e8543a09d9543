//! # PETRA Server Binary
//!
//! Remote control of the PETRA bench: one control client sends commands,
//! one telemetry client receives the sensor byte at a fixed interval.
//!
//! # Usage
//!
//! ```bash
//! # Real bench, default config at /etc/petra/petra.toml
//! petra_server
//!
//! # Explicit address and port (telemetry on port + 1)
//! petra_server --ip 10.59.28.2 --port 50000
//!
//! # Simulated bench with verbose logging
//! petra_server --config petra.toml -s -v
//! ```

#![deny(warnings)]

use clap::Parser;
use petra_common::config::{LogLevel, PetraConfig};
use petra_common::consts::DEFAULT_CONFIG_PATH;
use petra_server::{DriverRegistry, PetraServer};
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// PETRA Server - remote control of the PETRA bench
#[derive(Parser, Debug)]
#[command(name = "petra_server")]
#[command(version)]
#[command(about = "Command and telemetry server for the PETRA bench")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file. Defaults are used when omitted and
    /// the default path does not exist.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind both listeners to.
    #[arg(long, value_name = "ADDR")]
    ip: Option<String>,

    /// Control port. Telemetry listens on the next port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Use the simulated bench instead of the device files.
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("PETRA Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(Into::into)
        .and_then(run);
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("PETRA Server shutdown complete");
}

/// Load the configuration file and apply command line overrides.
fn load_config(args: &Args) -> Result<PetraConfig, petra_common::config::ConfigError> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = PetraConfig::load_or_default(&path, args.config.is_some())?;

    if let Some(ref ip) = args.ip {
        config.server.bind_address = ip.clone();
    }
    if let Some(port) = args.port {
        config.server.control_port = port;
        config.server.telemetry_port = None;
    }
    if args.simulate {
        config.devices.driver = "simulation".to_string();
    }
    Ok(config)
}

fn run(config: PetraConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: driver={}, bind={}, control={}, telemetry={}, poll={}ms",
        config.devices.driver,
        config.server.bind_address,
        config.server.control_port,
        config.server.telemetry_port(),
        config.poller.interval_ms,
    );

    let registry = DriverRegistry::with_builtin_drivers();
    let server = PetraServer::open(config, &registry)?;

    // Interrupt: same teardown as the normal exit path, then leave.
    let teardown = server.teardown_handle();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        if let Err(e) = teardown.run() {
            error!("Teardown after interrupt failed: {e}");
        }
        info!("Server closed by interrupt");
        process::exit(0);
    })?;

    let bound = server.bind()?;
    info!(
        "Control on {}, telemetry on {}",
        bound.control_addr()?,
        bound.telemetry_addr()?
    );

    let report = bound.serve()?;
    let processor = report.processor;
    info!(
        "Session ended ({:?}): {} commands, {} commits",
        processor.reason, processor.commands, processor.commits
    );
    if let Some(poller) = processor.poller {
        info!("Poller sent {} sensor bytes ({:?})", poller.sent, poller.stop);
    }
    Ok(())
}

/// Setup tracing subscriber from the configured level and CLI arguments.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        level.as_directive().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_line_number(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_line_number(true)
            .init();
    }
}
