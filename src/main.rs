//! # Holidex CLI (`hdx`)
//!
//! The `hdx` binary is the primary interface for Holidex. It provides
//! commands for database initialization, source ingestion, description
//! enrichment, and calendar lookups.
//!
//! ## Usage
//!
//! ```bash
//! hdx --config ./config/holidex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hdx init` | Create the SQLite database and run schema migrations |
//! | `hdx ingest [SOURCE]` | Load one or all configured JSONL sources |
//! | `hdx enrich` | Backfill missing descriptions over HTTP |
//! | `hdx date <YYYY-MM-DD>` | List holidays recorded on a date |
//! | `hdx show <ID>` | Print one occurrence with all its mentions |
//! | `hdx search "<query>"` | Substring search over canonical titles |
//! | `hdx stats` | Database totals and per-source coverage |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! hdx init --config ./config/holidex.toml
//!
//! # Load every configured source
//! hdx ingest --config ./config/holidex.toml
//!
//! # Reload a single source
//! hdx ingest calend.ru --config ./config/holidex.toml
//!
//! # See what enrichment would do, then do it
//! hdx enrich --dry-run --config ./config/holidex.toml
//! hdx enrich --config ./config/holidex.toml
//!
//! # Lookups
//! hdx date 2025-01-01 --config ./config/holidex.toml
//! hdx show 42 --config ./config/holidex.toml
//! hdx search "день радио" --config ./config/holidex.toml
//! ```

mod config;
mod db;
mod enrich;
mod extract;
mod fetch;
mod filter;
mod ingest;
mod migrate;
mod models;
mod normalize;
mod query;
mod records;
mod resolve;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Holidex CLI — a multi-source holiday calendar reconciliation and lookup
/// engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/holidex.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "hdx",
    about = "Holidex — a multi-source holiday calendar reconciliation and lookup engine",
    version,
    long_about = "Holidex ingests per-site scraper dumps (JSONL) into a deduplicated SQLite \
    calendar of holidays, occurrences, and source mentions, backfills missing descriptions \
    over HTTP, and serves date, occurrence, and title lookups from the CLI."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/holidex.toml`. Database location, source files,
    /// priorities, and enrichment settings are read from this file.
    #[arg(long, global = true, default_value = "./config/holidex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (sources,
    /// holidays, occurrences, mentions, descriptions_dict). This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Ingest one or all configured JSONL sources.
    ///
    /// Reads each source file line by line, validates and filters records,
    /// resolves them to holiday and occurrence identities, and appends one
    /// mention per kept record. Re-running is safe: identities are matched,
    /// not duplicated.
    Ingest {
        /// Source name as configured in `[[sources]]`. Omit to ingest all
        /// sources in config order.
        source: Option<String>,

        /// Maximum number of records to read per source.
        #[arg(long)]
        limit: Option<usize>,

        /// Dry run — show per-source record counts without writing to the
        /// database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Backfill missing descriptions for link-only mentions.
    ///
    /// Scans mentions from enrichment-flagged sources that have a URL but no
    /// description, resolves them against the description dictionary first,
    /// and fetches the remaining pages through a bounded worker pool. Page
    /// failures leave the mention undescribed; they never fail the run.
    Enrich {
        /// Maximum number of pending mentions to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Show pending and resolvable counts without fetching anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// List holidays recorded on a date.
    ///
    /// Prints every occurrence on the date that at least one source mentions,
    /// Russian titles first, described entries before bare ones.
    Date {
        /// Date in YYYY-MM-DD form.
        date: String,
    },

    /// Print one occurrence with all its mentions.
    ///
    /// Shows the holiday identity, the best available description, and every
    /// source mention in priority order.
    Show {
        /// Occurrence id (as printed by `hdx date`).
        id: i64,
    },

    /// Substring search over canonical holiday titles.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = query::SEARCH_LIMIT)]
        limit: usize,
    },

    /// Show database totals and per-source description coverage.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays parseable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("holidex=info,hdx=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            source,
            limit,
            dry_run,
        } => {
            ingest::run_ingest(&cfg, source.as_deref(), limit, dry_run).await?;
        }
        Commands::Enrich { limit, dry_run } => {
            enrich::run_enrich(&cfg, limit, dry_run).await?;
        }
        Commands::Date { date } => {
            query::run_date(&cfg, &date).await?;
        }
        Commands::Show { id } => {
            query::run_show(&cfg, id).await?;
        }
        Commands::Search { query, limit } => {
            query::run_search(&cfg, &query, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
