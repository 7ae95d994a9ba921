//! Strata CLI
//!
//! Command-line tools for repairing replica stores.
//!
//! Stores are read from and written to JSON snapshot files.
//!
//! # Commands
//!
//! - `resync` - Repair a replica snapshot against its master
//! - `inspect` - Show records from either side
//! - `diff` - List the repairs a resync would make
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Strata replica repair tools.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair a replica snapshot against its master
    Resync {
        /// Master snapshot file
        #[arg(long)]
        master: PathBuf,

        /// Replica snapshot file (created if missing)
        #[arg(long)]
        replica: PathBuf,

        /// Record type to resynchronize
        #[arg(short = 't', long = "type")]
        record_type: String,

        /// Fraction of full speed, in (0.0, 1.0]
        #[arg(short, long, default_value = "1.0")]
        speed: f64,

        /// Filter expression with `?` placeholders
        #[arg(long)]
        filter: Option<String>,

        /// Value bound to the next placeholder (repeatable)
        #[arg(long = "value")]
        values: Vec<String>,

        /// Require both stores to support the type before starting
        #[arg(long)]
        authoritative: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show records of one type
    Inspect {
        /// Master snapshot file
        #[arg(long)]
        master: PathBuf,

        /// Replica snapshot file
        #[arg(long)]
        replica: Option<PathBuf>,

        /// Record type to show
        #[arg(short = 't', long = "type")]
        record_type: String,

        /// Key value, one per key field (repeatable)
        #[arg(short, long = "key")]
        key: Vec<String>,

        /// Read from the replica instead of the master
        #[arg(long)]
        from_replica: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the repairs a resync would make, without writing
    Diff {
        /// Master snapshot file
        #[arg(long)]
        master: PathBuf,

        /// Replica snapshot file
        #[arg(long)]
        replica: PathBuf,

        /// Record type to compare
        #[arg(short = 't', long = "type")]
        record_type: String,

        /// Filter expression with `?` placeholders
        #[arg(long)]
        filter: Option<String>,

        /// Value bound to the next placeholder (repeatable)
        #[arg(long = "value")]
        values: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
        Commands::Resync {
            master,
            replica,
            record_type,
            speed,
            filter,
            values,
            authoritative,
            format,
        } => {
            let options = commands::resync::ResyncOptions {
                record_type,
                speed,
                filter,
                values,
                authoritative,
            };
            commands::resync::run(&master, &replica, &options, &format)?;
        }
        Commands::Inspect {
            master,
            replica,
            record_type,
            key,
            from_replica,
            format,
        } => {
            if from_replica && replica.is_none() {
                return Err("--from-replica requires --replica".into());
            }
            commands::inspect::run(
                &master,
                replica.as_deref(),
                &record_type,
                &key,
                from_replica,
                &format,
            )?;
        }
        Commands::Diff {
            master,
            replica,
            record_type,
            filter,
            values,
            format,
        } => {
            let scope = commands::diff::DiffScope { filter, values };
            commands::diff::run(&master, &replica, &record_type, &scope, &format)?;
        }
        Commands::Version => {
            println!("Strata CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Strata Core v{}", strata_core::VERSION);
            println!("Strata Resync v{}", strata_resync::VERSION);
        }
    }

    Ok(())
}
