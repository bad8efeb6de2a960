//! wifitracker - Main entry point
//!
//! `sniff` captures probe requests and writes them as a request log on
//! stdout; `analyze` reads such a log and prints the derived devices or
//! stations.

mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use wifitracker_core::{parse_records, read_records, read_records_from_path, Aggregator};
use wifitracker_sniffer::Sniffer;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "wifitracker")]
#[command(about = "Passive wifi probe request tracker")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "wifitracker.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate a request log into devices and/or stations
    Analyze {
        /// Which registry to print
        #[arg(value_enum)]
        view: View,

        /// Request log to read, `-` for stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Capture probe requests and print them as a request log
    Sniff {
        /// Monitor-mode interface (defaults to the configured one)
        interface: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    Devices,
    Stations,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the results, logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    debug!("wifitracker v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    match args.command {
        Command::Analyze { view, input } => analyze(&config, view, input).await,
        Command::Sniff { interface } => sniff(&config, interface).await,
    }
}

async fn analyze(config: &Config, view: View, input: Option<PathBuf>) -> Result<()> {
    let pipeline = config.to_pipeline_config();
    let capacity = pipeline.capacity();

    let records = match input.or_else(|| config.analyze.input.clone()) {
        Some(path) if path != Path::new("-") => {
            info!(path = %path.display(), "Analyzing request log");
            read_records_from_path(&path, capacity).await?
        }
        _ => {
            info!("Analyzing request log from stdin");
            read_records(tokio::io::stdin(), capacity)
        }
    };

    let requests = parse_records(records, &pipeline);
    let aggregator = Aggregator::new();

    match view {
        View::Devices => {
            aggregator.devices(requests).await;
        }
        View::Stations => {
            aggregator.stations(requests).await;
        }
        View::All => {
            aggregator.all(requests, capacity).await;
        }
    }

    let devices = match view {
        View::Devices | View::All => aggregator.device_snapshot().await,
        View::Stations => Vec::new(),
    };
    let stations = match view {
        View::Stations | View::All => aggregator.station_snapshot().await,
        View::Devices => Vec::new(),
    };

    info!(
        devices = devices.len(),
        stations = stations.len(),
        "Analysis complete"
    );

    let mut out = std::io::stdout().lock();
    output::write_entities(&mut out, &devices)?;
    output::write_entities(&mut out, &stations)?;
    Ok(())
}

async fn sniff(config: &Config, interface: Option<String>) -> Result<()> {
    let mut sniffer_config = config.to_sniffer_config();
    if let Some(interface) = interface {
        sniffer_config.interface = interface;
    }

    let mut requests = Sniffer::open(sniffer_config)?.sniff();

    let mut out = std::io::stdout();
    while let Some(request) = requests.recv().await {
        output::write_record(&mut out, &request)?;
    }

    info!("Capture ended");
    Ok(())
}
