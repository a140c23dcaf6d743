//! # lesson-sync CLI (`lsync`)
//!
//! ## Usage
//!
//! ```bash
//! lsync --config ./config/lsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lsync init` | Create the SQLite database and run schema migrations |
//! | `lsync sync` | Backfill: deliver every file under the content root |
//! | `lsync apply <path>...` | Deliver specific logical paths as notifications |
//! | `lsync synthesize <key>` | Rebuild one key's dictation exercise |
//! | `lsync get <key>` | Print a lesson record and its exercise |
//! | `lsync status` | Summarize records and exercises |
//! | `lsync serve` | Start the notification/read HTTP server |
//!
//! Keys are written `Level/Lesson/Pattern`, e.g. `Level1/Lesson3/B`.
//!
//! Logs go to stderr; set `RUST_LOG` to adjust (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lesson_sync::{config, dispatch, get, ingest, migrate, server, status, synthesize};

/// lesson-sync: convergent lesson aggregation and dictation synthesis.
#[derive(Parser)]
#[command(
    name = "lsync",
    about = "lesson-sync: convergent lesson aggregation and dictation synthesis",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Backfill every file under the content root.
    ///
    /// Each file is delivered as if a notification had arrived for it;
    /// dictation exercises are rebuilt once per key afterwards.
    Sync {
        /// Concurrent deliveries.
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Classify and count only; write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of files to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Deliver notifications for the given logical paths, in order.
    Apply {
        /// Logical object paths, e.g. `official/Level1/Lesson1/A/passage1/a_listening.mp3`.
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Rebuild the dictation exercise for one key.
    Synthesize {
        /// `Level/Lesson/Pattern`
        key: String,
    },

    /// Print a lesson record and its exercise as JSON.
    Get {
        /// `Level/Lesson/Pattern`
        key: String,
    },

    /// Summarize stored records and exercises.
    Status,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync {
            jobs,
            dry_run,
            limit,
        } => {
            ingest::run_sync(&cfg, jobs, dry_run, limit).await?;
        }
        Commands::Apply { paths } => {
            dispatch::run_apply(&cfg, &paths).await?;
        }
        Commands::Synthesize { key } => {
            synthesize::run_synthesize(&cfg, &key).await?;
        }
        Commands::Get { key } => {
            get::run_get(&cfg, &key).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
