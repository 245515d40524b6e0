//! Addon Pack - command-line interface for building addon packages
//!
//! Provides `addon-pack build`, `addon-pack list` and `addon-pack extract`.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::build::BuildArgs;

#[derive(Parser)]
#[command(name = "addon-pack")]
#[command(about = "Addon Pack - build versioned pipeline addon packages")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an addon package from client, server and service sources
    Build(BuildArgs),
    /// List the entries of an addon archive
    List {
        /// Archive to inspect
        archive: PathBuf,
    },
    /// Extract an addon archive
    Extract {
        /// Archive to extract
        archive: PathBuf,
        /// Destination directory
        dest: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::List { archive } => commands::inspect::list(&archive),
        Commands::Extract { archive, dest } => commands::inspect::extract(&archive, &dest),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
