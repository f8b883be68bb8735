//! foldersync - one-way periodic folder mirroring

use anyhow::Result;
use clap::Parser;
use cli_lib::config::{ConfigFile, SyncConfig};
use cli_lib::daemon::{self, RunMode};
use cli_lib::logging;
use std::path::PathBuf;

/// Keep a replica folder identical to a source folder
#[derive(Parser)]
#[command(name = "foldersync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the source folder
    source: Option<PathBuf>,

    /// Path to the replica folder (created if missing)
    replica: Option<PathBuf>,

    /// Synchronization interval in seconds
    interval: Option<u64>,

    /// Path to the log file (appended to, created if missing)
    log_file: Option<PathBuf>,

    /// TOML file providing any of the settings above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Also log debug events
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn resolve(&self) -> Result<SyncConfig> {
        let from_args = ConfigFile {
            source: self.source.clone(),
            replica: self.replica.clone(),
            interval_secs: self.interval,
            log_file: self.log_file.clone(),
        };
        let from_file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        Ok(SyncConfig::from_layers(from_args.or(from_file))?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration problems surface before anything is logged or touched
    let config = cli.resolve()?;
    let _guard = logging::init(&config.log_file, cli.verbose)?;

    let mode = if cli.once {
        RunMode::Once
    } else {
        RunMode::Forever
    };

    if let Err(e) = daemon::start(&config, mode).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
