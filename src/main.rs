//! # Nutri Ingest CLI (`nutri`)
//!
//! ## Usage
//!
//! ```bash
//! nutri --config ./config/nutri.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nutri init` | Create the SQLite database and the `foods` table |
//! | `nutri ingest` | Ingest foods from the configured API |
//! | `nutri ingest --from-file <path>` | Ingest foods from a CSV/TSV or JSON file |
//! | `nutri audit [path]` | Print the exercise dataset quality report |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`);
//! reports go to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nutri_ingest::config::{load_config, Config};
use nutri_ingest::{audit_cmd, ingest, migrate};

/// Nutri Ingest CLI: load nutrition data into SQLite and audit the
/// exercise dataset.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/nutri.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "nutri",
    about = "Nutri Ingest: nutrition data ingestion and dataset quality audit",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/nutri.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `foods` table. Running it
    /// again is a no-op.
    Init,

    /// Ingest foods from one source.
    ///
    /// Without `--from-file` the configured `[api]` source is used. A
    /// `.csv`/`.tsv` path is read as a flat-file export; anything else is
    /// read as a JSON document.
    Ingest {
        /// Read rows from this file instead of the API.
        #[arg(long)]
        from_file: Option<PathBuf>,
    },

    /// Report gaps in the enriched exercise dataset.
    ///
    /// Needs no database. Falls back to built-in defaults when the config
    /// file is absent.
    Audit {
        /// Exercise JSON document (defaults to `[audit].path`).
        path: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Audit works without a config file
    if let Commands::Audit { path } = &cli.command {
        let cfg = load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
        return audit_cmd::run_audit(&cfg.audit, path.as_deref());
    }

    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { from_file } => {
            ingest::run_ingest(&cfg, from_file.as_deref()).await?;
        }
        Commands::Audit { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
