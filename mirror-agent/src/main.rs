//! Mirror Agent - Main entry point
//!
//! Mirrors remote group content into a local directory tree.

use anyhow::Result;
use clap::Parser;
use mirror_agent::{config::Config, provider::HttpProvider, runner::MirrorRun, utils};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "mirror.toml")]
    config: PathBuf,

    /// Mirror root directory (overrides config)
    #[arg(long, value_name = "DIR")]
    mirror_root: Option<PathBuf>,

    /// Move local files that disappeared remotely into the archive
    #[arg(long)]
    delete: bool,

    /// Mirror only this group ID (repeatable; overrides config)
    #[arg(long = "group", value_name = "ID")]
    groups: Vec<i64>,

    /// Mirror groups from every cycle, not just the newest one
    #[arg(long)]
    all_cycles: bool,

    /// Maximum download attempts per file (overrides config)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)?;
    if let Some(mirror_root) = args.mirror_root {
        config.mirror.root_dir = mirror_root;
    }
    if args.delete {
        config.mirror.delete_removed = true;
    }
    if !args.groups.is_empty() {
        config.mirror.groups = args.groups;
    }
    if args.all_cycles {
        config.mirror.all_cycles = true;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.mirror.max_attempts = max_attempts;
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!("Starting mirror-agent v{}", env!("CARGO_PKG_VERSION"));
    if config.mirror.delete_removed {
        tracing::info!("Files removed remotely WILL be moved to the archive");
    } else {
        tracing::info!("Files removed remotely will be left in place");
    }
    tracing::info!("Mirroring into {}", config.mirror.root_dir.display());

    let provider = HttpProvider::new(&config.remote)?;
    let report = MirrorRun::new(&provider, &config.mirror).run().await?;

    let totals = report.totals();
    tracing::info!("Synchronization complete");
    tracing::info!("Groups processed: {}", report.groups.len());
    tracing::info!("Files added: {}", totals.added);
    tracing::info!("Files updated: {}", totals.updated);
    tracing::info!("Files deleted: {}", totals.deleted);
    tracing::info!("Files unchanged: {}", totals.unchanged);
    tracing::info!("Files failed: {}", totals.failed);

    if report.groups_selected > 0 && report.groups.is_empty() {
        anyhow::bail!("no groups could be processed");
    }
    if report.groups_selected == 0 {
        tracing::warn!("No groups were selected for mirroring");
    }

    Ok(())
}
