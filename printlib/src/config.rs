//! Library configuration.
//!
//! Settings live in an INI file, by default `~/.printlib/config.ini`:
//!
//! ```ini
//! [library]
//! store_directory = ~/.printlib/library
//! provider_key = ProviderSelectorKey
//!
//! [directory.Downloads]
//! path = ~/Downloads
//! extensions = stl,amf,gcode
//!
//! [logging]
//! level = info
//! file = ~/.printlib/printlib.log
//! ```
//!
//! Each `[directory.<Name>]` section becomes one directory provider, in file
//! order. Paths starting with `~` are expanded against the home directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::logging::LoggingConfig;
use crate::selector::SELECTOR_PROVIDER_KEY;

/// Directory under the home directory holding configuration and data.
pub const CONFIG_DIR_NAME: &str = ".printlib";

/// Configuration file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.ini";

const LIBRARY_SECTION: &str = "library";
const LOGGING_SECTION: &str = "logging";
const DIRECTORY_SECTION_PREFIX: &str = "directory.";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("missing '{key}' in section [{section}]")]
    MissingValue { section: String, key: String },
}

/// One configured directory-tree provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRootConfig {
    /// Display name of the provider.
    pub name: String,
    /// Root directory.
    pub path: PathBuf,
    /// Item extensions; `None` uses the provider defaults.
    pub extensions: Option<Vec<String>>,
}

impl DirectoryRootConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            extensions: None,
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }
}

/// Top-level library configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Root of the canonical store.
    pub store_directory: PathBuf,
    /// Override of the selector's own provider key.
    pub provider_key: Option<String>,
    /// Directory providers, in registry order.
    pub directories: Vec<DirectoryRootConfig>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let directories = dirs::download_dir()
            .filter(|p| p.is_dir())
            .map(|p| vec![DirectoryRootConfig::new("Downloads", p)])
            .unwrap_or_default();
        Self {
            store_directory: config_dir().join("library"),
            provider_key: None,
            directories,
            logging: LoggingConfig::default(),
        }
    }
}

impl LibraryConfig {
    /// Configuration with a store directory and no directory providers.
    pub fn new(store_directory: impl Into<PathBuf>) -> Self {
        Self {
            store_directory: store_directory.into(),
            provider_key: None,
            directories: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }

    /// Add a directory provider.
    pub fn with_directory(mut self, directory: DirectoryRootConfig) -> Self {
        self.directories.push(directory);
        self
    }

    /// Override the selector's provider key.
    pub fn with_provider_key(mut self, key: impl Into<String>) -> Self {
        self.provider_key = Some(key.into());
        self
    }

    /// Set logging configuration.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Key the top-level selector uses.
    pub fn selector_key(&self) -> &str {
        self.provider_key.as_deref().unwrap_or(SELECTOR_PROVIDER_KEY)
    }

    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Load the default configuration file, or defaults when it is absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse INI text. `origin` names the source in error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::new(config_dir().join("library"));

        if let Some(library) = ini.section(Some(LIBRARY_SECTION)) {
            if let Some(dir) = library.get("store_directory") {
                config.store_directory = expand_tilde(dir);
            }
            config.provider_key = library
                .get("provider_key")
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string);
        }

        if let Some(logging) = ini.section(Some(LOGGING_SECTION)) {
            if let Some(level) = logging.get("level") {
                config.logging.level = level.trim().to_string();
            }
            config.logging.file = logging
                .get("file")
                .filter(|f| !f.trim().is_empty())
                .map(expand_tilde);
        }

        for (section, properties) in ini.iter() {
            let Some(name) = section.and_then(|s| s.strip_prefix(DIRECTORY_SECTION_PREFIX)) else {
                continue;
            };
            let path = properties
                .get("path")
                .ok_or_else(|| ConfigError::MissingValue {
                    section: format!("{}{}", DIRECTORY_SECTION_PREFIX, name),
                    key: "path".to_string(),
                })?;
            let mut directory = DirectoryRootConfig::new(name, expand_tilde(path));
            if let Some(extensions) = properties.get("extensions") {
                directory = directory.with_extensions(
                    extensions
                        .split(',')
                        .map(str::trim)
                        .filter(|e| !e.is_empty()),
                );
            }
            config.directories.push(directory);
        }

        Ok(config)
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        {
            let mut library = ini.with_section(Some(LIBRARY_SECTION));
            library.set("store_directory", self.store_directory.display().to_string());
            if let Some(key) = &self.provider_key {
                library.set("provider_key", key.as_str());
            }
        }
        for directory in &self.directories {
            let section = format!("{}{}", DIRECTORY_SECTION_PREFIX, directory.name);
            let mut setter = ini.with_section(Some(section));
            setter.set("path", directory.path.display().to_string());
            if let Some(extensions) = &directory.extensions {
                setter.set("extensions", extensions.join(","));
            }
        }
        {
            let mut logging = ini.with_section(Some(LOGGING_SECTION));
            logging.set("level", self.logging.level.as_str());
            if let Some(file) = &self.logging.file {
                logging.set("file", file.display().to_string());
            }
        }
        ini
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }
}

/// `~/.printlib`, or `./.printlib` without a home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` against the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let path = path.trim();
    let home = dirs::home_dir();
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
