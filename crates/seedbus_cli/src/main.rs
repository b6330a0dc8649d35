//! SeedBus CLI
//!
//! Command-line tools for seeding test fixtures.
//!
//! # Commands
//!
//! - `check` - Load a configuration and show its entity mappings
//! - `seed` - Run a scenario file against the configured store
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SeedBus fixture seeding tools.
#[derive(Parser)]
#[command(name = "seedbus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration and show its entity mappings
    Check {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a scenario against the configured store
    Seed {
        /// Path to the scenario file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Undo the scenario after running it
        #[arg(short, long)]
        reset: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Check { format } => {
            let config = cli.config.ok_or("Configuration path required for check")?;
            commands::check::run(&config, &format)?;
        }
        Commands::Seed { scenario, reset } => {
            let config = cli.config.ok_or("Configuration path required for seed")?;
            commands::seed::run(&config, &scenario, reset)?;
        }
        Commands::Version => {
            println!("SeedBus CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("SeedBus Core v{}", seedbus_core::VERSION);
        }
    }

    Ok(())
}
