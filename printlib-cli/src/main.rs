//! PrintLib CLI - Command-line interface
//!
//! Browse the composite library and import files into it from the terminal.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use printlib::logging::init_logging;

use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "printlib", version, about = "Browse a composite 3D print library")]
struct Cli {
    /// Configuration file (defaults to ~/.printlib/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the registered providers
    Providers,

    /// List collections and items, navigating by display names
    Ls {
        /// Collection names to enter, starting at the root
        path: Vec<String>,
    },

    /// Print the encoded locator of a view
    Locate {
        /// Collection names to enter, starting at the root
        path: Vec<String>,
    },

    /// Import files into the library
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target locator as printed by `locate` (defaults to the library root)
        #[arg(long)]
        into: Option<String>,
    },

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = commands::common::load_config(cli.config.as_deref())?;
    match cli.verbose {
        0 => {}
        1 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }
    // Held until exit so buffered log lines are flushed.
    let _guard = init_logging(&config.logging)?;

    match cli.command {
        Commands::Providers => commands::browse::run_providers(&config),
        Commands::Ls { path } => commands::browse::run_ls(&config, &path),
        Commands::Locate { path } => commands::browse::run_locate(&config, &path),
        Commands::Import { files, into } => commands::import::run(&config, &files, into.as_deref()),
        Commands::Config(command) => commands::config::run(command, &config, cli.config.as_deref()),
    }
}
