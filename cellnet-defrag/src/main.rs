//! Cellnet Defragmentation Service
//!
//! Demo driver for the defragmentation engine:
//! - Builds a randomized in-memory storage network
//! - Prints the diagnostic cell scan report
//! - Optionally runs a reshuffle, one batch per scheduling tick

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn, Level};

use cellnet_core::{DeviceKind, Entry, EntryId, ValueKind};
use cellnet_defrag::{DefragConfig, ReshuffleTask, ScanReport};
use cellnet_storage::{MemoryCell, MemoryNetwork};

#[derive(Parser)]
#[command(name = "cellnet-defrag")]
#[command(about = "Cellnet storage-cell defragmentation service")]
struct Cli {
    /// Number of cell drives in the demo network
    #[arg(long, default_value = "4")]
    drives: usize,

    /// Random seed for demo network population
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Run a reshuffle after the scan report
    #[arg(long, default_value = "false")]
    reshuffle: bool,

    /// Confirm a large-network run without prompting
    #[arg(long, default_value = "false")]
    yes: bool,

    /// Scheduling tick length in milliseconds
    #[arg(long, default_value = "50")]
    tick_ms: u64,

    /// Entries processed per tick
    #[arg(long)]
    batch_size: Option<usize>,

    /// Disable the simulate-before-commit safety gate
    #[arg(long, default_value = "false")]
    no_void_protection: bool,

    /// Emit reports as JSON instead of text
    #[arg(long, default_value = "false")]
    json: bool,
}

const ITEM_NAMES: &[&str] = &[
    "Iron Ingot",
    "Gold Ingot",
    "Cobblestone",
    "Oak Log",
    "Redstone Dust",
    "Coal",
    "Diamond",
    "Glass",
];

/// Build a demo network with a deliberate mix of healthy, type-locked,
/// and duplicate-partitioned cells.
fn build_demo_network(cli: &Cli) -> anyhow::Result<MemoryNetwork> {
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let network = MemoryNetwork::new();

    for drive in 0..cli.drives {
        let location = format!("drive-{drive}");
        network.add_device(DeviceKind::Drive, &location, 10);

        // Slot 0: general-purpose bulk cell.
        network.install_cell(
            &location,
            0,
            MemoryCell::new(ValueKind::Item, "16k Storage Cell", 16384, 63),
        )?;

        // Slot 1: tight type budget; filling every slot type-locks it.
        network.install_cell(
            &location,
            1,
            MemoryCell::new(ValueKind::Item, "1k Storage Cell", 1024, 4),
        )?;
        for name in ITEM_NAMES.iter().take(4) {
            let amount = rng.gen_range(1..40);
            network.seed(
                &location,
                1,
                &Entry::new(EntryId::new(*name, ValueKind::Item), amount),
            )?;
        }

        // First two drives carry identically partitioned cells so the
        // duplicate detector has something to flag.
        if drive < 2 {
            network.install_cell(
                &location,
                2,
                MemoryCell::new(ValueKind::Item, "4k Storage Cell", 4096, 63)
                    .with_partition(&["Iron Ingot", "Gold Ingot"]),
            )?;
        }

        // Scatter bulk entries directly into the general cell.
        for name in ITEM_NAMES {
            let amount = rng.gen_range(0..500);
            if amount > 0 {
                network.seed(
                    &location,
                    0,
                    &Entry::new(EntryId::new(*name, ValueKind::Item), amount),
                )?;
            }
        }
    }

    // One fluid chest on the side.
    network.add_device(DeviceKind::Chest, "chest-0", 1);
    network.install_cell(
        "chest-0",
        0,
        MemoryCell::new(ValueKind::Fluid, "4k Fluid Cell", 4096, 5),
    )?;
    network.seed(
        "chest-0",
        0,
        &Entry::new(EntryId::new("Water", ValueKind::Fluid), 3000),
    )?;

    Ok(network)
}

fn print_scan_report(network: &MemoryNetwork, config: &DefragConfig, json: bool) -> anyhow::Result<()> {
    let records = cellnet_defrag::scan(network);
    let report = ScanReport::build(&records, config.top_fragmented);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_reshuffle(
    network: MemoryNetwork,
    config: DefragConfig,
    cli: &Cli,
) -> anyhow::Result<()> {
    let mut task = ReshuffleTask::new(
        Arc::new(network),
        ValueKind::ALL.to_vec(),
        config.clone(),
    );

    let total = task.initialize()?;
    info!(total, "Reshuffle initialized");

    if task.needs_confirmation() {
        if !cli.yes {
            warn!(
                total,
                threshold = config.confirm_threshold,
                "Large network; re-run with --yes to confirm"
            );
            task.cancel();
            return Ok(());
        }
        task.confirm();
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(cli.tick_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !task.process_next_batch() {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received, cancelling reshuffle");
                task.cancel();
                break;
            }
        }
    }

    if task.is_completed() {
        let report = task
            .report()
            .ok_or_else(|| anyhow::anyhow!("completed task produced no report"))?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            for line in report.lines(config.top_fragmented) {
                println!("{line}");
            }
        }
    } else {
        info!(
            processed = task.processed_items(),
            skipped = task.skipped_items(),
            "Reshuffle did not complete"
        );
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let mut config = DefragConfig::from_env()?;
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if cli.no_void_protection {
        config.void_protection = false;
    }

    info!(
        drives = cli.drives,
        batch_size = config.batch_size,
        void_protection = config.void_protection,
        "Starting cellnet defragmentation service"
    );

    let network = build_demo_network(&cli)?;
    print_scan_report(&network, &config, cli.json)?;

    if cli.reshuffle {
        run_reshuffle(network, config, &cli).await?;
    }

    Ok(())
}
