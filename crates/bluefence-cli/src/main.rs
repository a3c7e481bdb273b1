//! Operator CLI for the Bluefence classification core.
//!
//! The live BLE stack is an external collaborator; this binary replays
//! capture files through the same pipeline it would feed, and serves the
//! query/flag/export surface over the persisted ledgers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bluefence_core::{Config, DiscoveryEvent, Finding};
use bluefence_ledger::FileRegistry;
use bluefence_pipeline::{Pipeline, ScanSession, StaticLookup};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bluefence")]
#[command(about = "Rogue wireless device classification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "bluefence.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a discovery capture file through the classification pipeline
    Replay {
        /// JSON file holding an array of discovery events
        capture: PathBuf,

        /// Optional JSON map of address to known findings
        #[arg(short = 'f', long)]
        findings: Option<PathBuf>,
    },

    /// List merged device state, strongest signal first
    Devices,

    /// Show derived statistics
    Stats,

    /// Flag a device as rogue with a reason
    Flag {
        /// Device address
        address: String,

        /// Reason for the flag
        #[arg(short, long, default_value = "Manual flag")]
        reason: String,
    },

    /// Clear a manual flag from a device
    Unflag {
        /// Device address
        address: String,
    },

    /// Export a snapshot of merged state to the data directory
    Export,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .init();

    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Commands::Replay { capture, findings } => replay(config, &capture, findings.as_deref()).await,
        Commands::Devices => devices(config).await,
        Commands::Stats => stats(config).await,
        Commands::Flag { address, reason } => flag(config, &address, &reason).await,
        Commands::Unflag { address } => unflag(config, &address).await,
        Commands::Export => export(config).await,
    }
}

async fn open_pipeline(
    config: Config,
    lookup: StaticLookup,
) -> anyhow::Result<Pipeline<FileRegistry, StaticLookup>> {
    let registry = FileRegistry::open(config.data_dir.clone())
        .await
        .context("failed to open ledger directory")?;
    Ok(Pipeline::new(Arc::new(registry), Arc::new(lookup), config))
}

async fn replay(
    config: Config,
    capture: &std::path::Path,
    findings: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(capture)
        .await
        .with_context(|| format!("failed to read capture {}", capture.display()))?;
    let events: Vec<DiscoveryEvent> =
        serde_json::from_str(&text).context("capture is not a discovery event array")?;

    let mut lookup = StaticLookup::new();
    if let Some(path) = findings {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read findings {}", path.display()))?;
        let table: HashMap<String, Vec<Finding>> =
            serde_json::from_str(&text).context("findings file is not an address map")?;
        for (address, findings) in table {
            lookup = lookup.with_findings(address, findings);
        }
    }

    let pipeline = Arc::new(open_pipeline(config, lookup).await?);
    let session = ScanSession::start(Arc::clone(&pipeline));

    let total = events.len();
    for event in events {
        session.submit(event);
    }
    let accepted = session.stop().await;
    println!("Replayed {accepted} of {total} events");

    let stats = pipeline.statistics().await?;
    println!(
        "{} devices, {} flagged, {} critical, {} recently seen",
        stats.total, stats.flagged, stats.critical, stats.recently_seen
    );
    Ok(())
}

async fn devices(config: Config) -> anyhow::Result<()> {
    let pipeline = open_pipeline(config, StaticLookup::new()).await?;
    let devices = pipeline.list_devices().await?;

    if devices.is_empty() {
        println!("No devices recorded");
        return Ok(());
    }

    println!("{:<20} {:<24} {:>6} {:>8}  {:<12} {:<6}", "ADDRESS", "NAME", "RSSI", "DIST(m)", "TYPE", "THREAT");
    for device in devices {
        let rssi = if device.rssi == i32::MIN {
            "-".to_string()
        } else {
            device.rssi.to_string()
        };
        println!(
            "{:<20} {:<24} {:>6} {:>8.2}  {:<12} {:?}{}",
            device.address,
            device.name.as_deref().unwrap_or("Unknown"),
            rssi,
            device.distance,
            device.device_type.to_string(),
            device.threat,
            if device.flagged { " [FLAGGED]" } else { "" },
        );
    }
    Ok(())
}

async fn stats(config: Config) -> anyhow::Result<()> {
    let pipeline = open_pipeline(config, StaticLookup::new()).await?;
    let stats = pipeline.statistics().await?;
    println!("Total devices:   {}", stats.total);
    println!("Flagged:         {}", stats.flagged);
    println!("Critical:        {}", stats.critical);
    println!("Seen last hour:  {}", stats.recently_seen);
    Ok(())
}

async fn flag(config: Config, address: &str, reason: &str) -> anyhow::Result<()> {
    let operator = config.operator.clone();
    let pipeline = open_pipeline(config, StaticLookup::new()).await?;
    pipeline.flag(address, reason, &operator).await?;
    println!("Flagged {address}: {reason}");
    Ok(())
}

async fn unflag(config: Config, address: &str) -> anyhow::Result<()> {
    let pipeline = open_pipeline(config, StaticLookup::new()).await?;
    pipeline.unflag(address).await?;
    println!("Unflagged {address} (ledger history retained)");
    Ok(())
}

async fn export(config: Config) -> anyhow::Result<()> {
    let pipeline = open_pipeline(config, StaticLookup::new()).await?;
    let path = pipeline.export_to_file().await?;
    println!("Exported snapshot to {}", path.display());
    Ok(())
}
