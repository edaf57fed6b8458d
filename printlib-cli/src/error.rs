//! CLI error type.

use std::fmt;

use printlib::{ConfigError, LibraryError, LocatorParseError, LoggingError};

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config(ConfigError),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// A library operation failed.
    Library(LibraryError),
    /// A `--into` locator could not be decoded.
    Locator(LocatorParseError),
    /// A collection name given on the command line does not exist.
    CollectionNotFound(String),
    /// The store directory could not be created.
    StoreDirectory(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Library(e) => write!(f, "{}", e),
            CliError::Locator(e) => write!(f, "Invalid locator: {}", e),
            CliError::CollectionNotFound(name) => {
                write!(f, "No collection named '{}' here. Use 'printlib ls' to see what exists.", name)
            }
            CliError::StoreDirectory(msg) => write!(f, "Store directory: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<LibraryError> for CliError {
    fn from(e: LibraryError) -> Self {
        CliError::Library(e)
    }
}

impl From<LocatorParseError> for CliError {
    fn from(e: LocatorParseError) -> Self {
        CliError::Locator(e)
    }
}
