//! Configuration CLI commands.
//!
//! Provides `config path` and `config show`.

use std::path::Path;

use clap::Subcommand;
use printlib::config::config_file_path;
use printlib::LibraryConfig;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,
}

/// Run a config subcommand.
pub fn run(
    command: ConfigCommands,
    config: &LibraryConfig,
    explicit_path: Option<&Path>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            match explicit_path {
                Some(path) => println!("{}", path.display()),
                None => println!("{}", config_file_path().display()),
            }
            Ok(())
        }
        ConfigCommands::Show => {
            run_show(config);
            Ok(())
        }
    }
}

fn run_show(config: &LibraryConfig) {
    println!("[library]");
    println!("  store_directory = {}", config.store_directory.display());
    println!("  provider_key = {}", config.selector_key());

    for directory in &config.directories {
        println!();
        println!("[directory.{}]", directory.name);
        println!("  path = {}", directory.path.display());
        match &directory.extensions {
            Some(extensions) => println!("  extensions = {}", extensions.join(",")),
            None => println!("  extensions = (default)"),
        }
    }

    println!();
    println!("[logging]");
    println!("  level = {}", config.logging.level);
    match &config.logging.file {
        Some(file) => println!("  file = {}", file.display()),
        None => println!("  file = (stderr)"),
    }
}
