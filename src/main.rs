//! Tidewater main entry point
//!
//! This is the command-line interface for the Tidewater crawl frontier.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tidewater::config::{load_config_with_hash, Config};
use tidewater::crawler::crawl;
use tidewater::frontier::ClaimPolicy;
use tidewater::output::{load_statistics, print_statistics};
use tidewater::registry::{mark_status, seed_domain, seed_url};
use tidewater::storage::{open_storage, SqliteStorage};
use tidewater::DomainStatus;
use tracing_subscriber::EnvFilter;

/// Tidewater: a distributed crawl frontier
///
/// Any number of Tidewater workers can share one database. Each claims a
/// batch of eligible URLs, fetches them, queues the links it finds and
/// records the results.
#[derive(Parser, Debug)]
#[command(name = "tidewater")]
#[command(version)]
#[command(about = "A distributed crawl frontier", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply without one)
    #[arg(short, long, value_name = "PATH", env = "TIDEWATER_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overriding the configuration file
    #[arg(long, value_name = "PATH", env = "TIDEWATER_DB_PATH")]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a domain and queue its homepage
    SeedDomain {
        /// Domain name or URL, e.g. example.com
        name: String,

        /// Free-text notes stored with a new domain
        #[arg(long)]
        notes: Option<String>,
    },

    /// Queue a single URL
    SeedUrl {
        url: String,

        /// Attach to an existing domain instead of resolving one
        #[arg(long)]
        domain_id: Option<i64>,
    },

    /// Claim and process batches until nothing is eligible
    Crawl {
        /// Override the configured batch size
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        batch_size: Option<u32>,

        /// Stop after this many batches
        #[arg(long)]
        batches: Option<usize>,
    },

    /// Activate or deactivate a domain
    DomainStatus {
        domain_id: i64,

        /// active or inactive
        status: DomainStatus,
    },

    /// Show frontier statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref(), cli.database.as_deref())?;

    match cli.command {
        Command::SeedDomain { name, notes } => {
            let mut storage = open(&config)?;
            let seeded = seed_domain(&mut storage, &name, notes.as_deref(), Utc::now())
                .with_context(|| format!("Failed to seed domain '{}'", name))?;
            if seeded.created {
                println!(
                    "Domain '{}' added with ID: {}",
                    seeded.normalized_domain, seeded.domain_id
                );
            } else {
                println!(
                    "Domain '{}' already exists with ID: {}",
                    seeded.normalized_domain, seeded.domain_id
                );
            }
        }

        Command::SeedUrl { url, domain_id } => {
            let mut storage = open(&config)?;
            let seeded = seed_url(&mut storage, &url, domain_id, Utc::now())
                .with_context(|| format!("Failed to seed URL '{}'", url))?;
            if seeded.created {
                println!("Added seed URL '{}' with ID: {}", seeded.normalized_url, seeded.url_id);
            } else {
                println!(
                    "URL '{}' already exists with ID: {}",
                    seeded.normalized_url, seeded.url_id
                );
            }
        }

        Command::Crawl {
            batch_size,
            batches,
        } => {
            handle_crawl(config, batch_size, batches).await?;
        }

        Command::DomainStatus { domain_id, status } => {
            let mut storage = open(&config)?;
            if !mark_status(&mut storage, domain_id, status, Utc::now())? {
                bail!("Domain {} not found", domain_id);
            }
            println!("Domain {} is now {}", domain_id, status);
        }

        Command::Stats => {
            let storage = open(&config)?;
            println!("Database: {}\n", config.store.database_path);
            let stats = load_statistics(&storage, &ClaimPolicy::from_config(&config.crawler), Utc::now())?;
            print_statistics(&stats);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("tidewater=info,warn"),
                1 => EnvFilter::new("tidewater=debug,info"),
                2 => EnvFilter::new("tidewater=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, if any, and applies command-line overrides
fn load_configuration(path: Option<&Path>, database: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(database) = database {
        config.store.database_path = database.display().to_string();
    }

    Ok(config)
}

/// Opens the shared store; failure here is fatal
fn open(config: &Config) -> anyhow::Result<SqliteStorage> {
    open_storage(
        Path::new(&config.store.database_path),
        config.store.busy_timeout(),
    )
    .with_context(|| format!("Failed to open database {}", config.store.database_path))
}

/// Handles the main crawl operation
async fn handle_crawl(
    mut config: Config,
    batch_size: Option<u32>,
    batches: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(batch_size) = batch_size {
        config.crawler.batch_size = batch_size;
    }

    tracing::info!(
        "Starting crawl: batch size {}, recrawl window {}h, {} concurrent fetches",
        config.crawler.batch_size,
        config.crawler.recrawl_window_hours,
        config.crawler.max_concurrent_fetches
    );

    let report = crawl(&config, batches).await.map_err(|e| {
        tracing::error!("Crawl failed: {}", e);
        e
    })?;

    println!(
        "Crawled {} batches: {} completed, {} failed, {} lost, {} new links ({} homepages queued)",
        report.batches,
        report.totals.completed,
        report.totals.failed,
        report.totals.lost,
        report.totals.links_created,
        report.homepages_added
    );

    Ok(())
}
