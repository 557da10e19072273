//! EduSync CLI
//!
//! Command-line tools for exercising the EduSync synchronizer.
//!
//! # Commands
//!
//! - `demo` - Walk a student through a lesson and show what the cache does
//! - `burst` - Publish a burst of updates and watch them settle
//! - `replay` - Publish updates from a JSON lines file
//! - `rules` - Print the invalidation rules

mod commands;

use clap::{Parser, Subcommand};
use edusync_core::{Category, SyncConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// EduSync command-line tools.
#[derive(Parser)]
#[command(name = "edusync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Debounce window in milliseconds
    #[arg(global = true, long, default_value = "1000")]
    debounce_ms: u64,

    /// Cache entry lifetime in seconds
    #[arg(global = true, long, default_value = "300")]
    ttl_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a student through a lesson and show the resulting cache state
    Demo {
        /// Student the lesson belongs to
        #[arg(short, long, default_value = "student-42")]
        student: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Publish a burst of updates to one key and wait for it to settle
    Burst {
        /// Category to publish under
        #[arg(short, long, default_value = "progress")]
        category: String,

        /// Entity to publish for
        #[arg(short, long)]
        entity: Option<String>,

        /// Number of updates
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,

        /// Delay between updates in milliseconds
        #[arg(short, long, default_value = "50")]
        interval_ms: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Publish updates read from a JSON lines file
    Replay {
        /// File with one update per line
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print which keys each category invalidates
    Rules {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SyncConfig::new()
        .debounce_window(Duration::from_millis(cli.debounce_ms))
        .default_ttl(Duration::from_secs(cli.ttl_secs));

    match cli.command {
        Commands::Demo { student, format } => {
            commands::demo::run(config, &student, &format).await?;
        }
        Commands::Burst {
            category,
            entity,
            count,
            interval_ms,
            format,
        } => {
            let category: Category = category.parse()?;
            let interval = Duration::from_millis(interval_ms);
            commands::burst::run(config, category, entity, count, interval, &format).await?;
        }
        Commands::Replay { file, format } => {
            commands::replay::run(config, &file, &format).await?;
        }
        Commands::Rules { format } => {
            commands::rules::run(&format)?;
        }
        Commands::Version => {
            println!("EduSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EduSync Core v{}", edusync_core::VERSION);
        }
    }

    Ok(())
}
