//! Common helpers shared across CLI commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use printlib::store::DirectoryProvider;
use printlib::{
    CollectionDescriptor, LibraryConfig, LibraryProvider, ProviderSelector,
    StaticPluginDiscovery, DATABASE_PROVIDER_KEY,
};
use tracing::debug;

use crate::error::CliError;

/// Display name of the canonical store.
pub const LIBRARY_NAME: &str = "Library";

/// Load configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<LibraryConfig, CliError> {
    let config = match path {
        Some(path) => LibraryConfig::load(path)?,
        None => LibraryConfig::load_default()?,
    };
    Ok(config)
}

/// Build the top-level selector.
///
/// The canonical store is a directory provider at the configured store
/// directory, created on first use.
pub fn build_selector(config: &LibraryConfig) -> Result<ProviderSelector, CliError> {
    fs::create_dir_all(&config.store_directory).map_err(|e| {
        CliError::StoreDirectory(format!("{}: {}", config.store_directory.display(), e))
    })?;

    let database = DirectoryProvider::new(&config.store_directory, LIBRARY_NAME)?
        .with_provider_key(DATABASE_PROVIDER_KEY)
        .with_parent_key(config.selector_key());

    Ok(ProviderSelector::from_config(
        config,
        Arc::new(database),
        &StaticPluginDiscovery::new(),
    ))
}

/// Find the collection named `name` in the provider's current view.
pub fn find_collection(
    provider: &dyn LibraryProvider,
    name: &str,
) -> Result<CollectionDescriptor, CliError> {
    for index in 0..provider.collection_count() {
        let collection = provider.collection_at(index)?;
        if collection.name == name {
            return Ok(collection);
        }
    }
    Err(CliError::CollectionNotFound(name.to_string()))
}

/// Enter each named collection in turn, starting from the current view.
pub fn navigate(selector: &ProviderSelector, names: &[String]) -> Result<(), CliError> {
    for name in names {
        let collection = find_collection(selector, name)?;
        debug!(name = %name, key = %collection.key, "Entering collection");
        selector.set_collection_base(&collection)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> LibraryConfig {
        LibraryConfig::new(dir.path().join("store"))
    }

    #[test]
    fn test_build_selector_creates_store() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let selector = build_selector(&config).unwrap();
        assert!(config.store_directory.is_dir());
        assert_eq!(selector.registry().len(), 1);
        assert!(selector.registry().canonical().is_ok());
    }

    #[test]
    fn test_navigate_by_names() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fs::create_dir_all(config.store_directory.join("Gears")).unwrap();

        let selector = build_selector(&config).unwrap();
        navigate(&selector, &[LIBRARY_NAME.to_string(), "Gears".to_string()]).unwrap();
        assert_eq!(selector.breadcrumbs().len(), 3);

        let err = navigate(&selector, &["Missing".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::CollectionNotFound(ref n) if n == "Missing"));
    }
}
