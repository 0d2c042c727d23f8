//! Ticker Crawler CLI
//!
//! Polls one currency pair until interrupted. Run under a process supervisor:
//! an unhandled fault is logged and the process exits.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use ticker_crawler::{
    error::{AppError, Result},
    logging,
    models::{Config, CurrencyPair},
    pipeline::{self, DayKey},
    storage::LocalStorage,
};

/// Ticker Crawler - adaptive exchange ticker poller
#[derive(Parser, Debug)]
#[command(name = "ticker-crawler", version, about = "Adaptive exchange ticker poller")]
struct Cli {
    /// Path to storage directory containing config.toml, data and logs
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use the test environment directory for data and logs
    #[arg(short, long, global = true)]
    test: bool,

    /// Append logs to {log_dir}/debug/app_{pair}.log (errors also to
    /// {log_dir}/error/app_{pair}.log) instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the ticker of a currency pair until interrupted
    Run {
        /// Currency pair, e.g. btc_krw
        pair: String,
    },

    /// Compress one day of samples
    Archive {
        pair: String,
        /// Day to archive (YYYY-MM-DD)
        day: String,
    },

    /// Validate configuration file
    Validate,

    /// Show stored days and archives of a pair
    Info { pair: String },
}

impl Command {
    fn pair(&self) -> Option<&str> {
        match self {
            Command::Run { pair } | Command::Archive { pair, .. } | Command::Info { pair } => {
                Some(pair)
            }
            Command::Validate => None,
        }
    }
}

/// Log unhandled faults before the default hook reports them.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!(
            "Unhandled fault: {}\n{}",
            info,
            std::backtrace::Backtrace::force_capture()
        );
        default_hook(info);
    }));
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("SIGINT: stopping poller"),
        _ = terminate => log::info!("SIGTERM: stopping poller"),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    install_panic_hook();

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let (config, load_error) = match Config::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let pair = cli
        .command
        .pair()
        .map(|raw| CurrencyPair::parse(raw, &config.pairs))
        .transpose()?;
    let label = pair.as_ref().map_or("ticker", CurrencyPair::as_str).to_string();

    init_logging(&cli, &config, &label)?;
    if let Some(e) = load_error {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            config_path.display(),
            e
        );
    }

    let data_root = config.data_root(&cli.storage_dir, cli.test);

    match (cli.command, pair) {
        (Command::Run { .. }, Some(pair)) => {
            config.validate()?;
            log::info!("Ticker crawler starting for {}...", pair);

            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.cancel();
            });

            let summary = pipeline::run_poller(&config, &pair, &data_root, cancel).await?;
            log::info!("Polled {} cycles", summary.cycles);
        }

        (Command::Archive { day, .. }, Some(pair)) => {
            let day = DayKey::parse(&day).ok_or_else(|| {
                AppError::validation(format!("Invalid day '{day}', expected YYYY-MM-DD"))
            })?;
            let metadata = pipeline::run_archive(&data_root, &pair, &day).await?;
            log::info!(
                "Archived {} samples of {} ({} -> {} bytes)",
                metadata.sample_count,
                metadata.day,
                metadata.original_bytes,
                metadata.compressed_bytes
            );
        }

        (Command::Validate, _) => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} pairs, {} requests/min)",
                config.pairs.len(),
                config.pulse.per_minute_quota
            );
        }

        (Command::Info { .. }, Some(pair)) => {
            show_info(&data_root, &pair).await?;
        }

        (_, None) => unreachable!("pair-taking commands always parse a pair"),
    }

    log::info!("Done!");
    Ok(())
}

fn init_logging(cli: &Cli, config: &Config, label: &str) -> Result<()> {
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        logging::parse_level(&config.logging.level)
    };
    let log_dir = cli
        .log_file
        .then(|| config.log_root(&cli.storage_dir, cli.test));
    logging::init(level, label, log_dir.as_deref())
}

async fn show_info(data_root: &Path, pair: &CurrencyPair) -> Result<()> {
    let storage = LocalStorage::new(data_root.join(pair.as_str()));
    let inventory = storage.inventory().await?;

    log::info!("Data directory: {}", storage.root_dir().display());
    if inventory.days.is_empty() {
        log::info!("No samples stored yet.");
        return Ok(());
    }
    log::info!(
        "Days: {} ({} .. {})",
        inventory.days.len(),
        inventory.days.first().map_or("-", String::as_str),
        inventory.days.last().map_or("-", String::as_str)
    );
    log::info!("Archives: {}", inventory.archives.len());
    for archive in &inventory.archives {
        log::info!("    {}", archive);
    }
    Ok(())
}
