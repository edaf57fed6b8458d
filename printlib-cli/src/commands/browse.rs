//! Browsing commands: `providers`, `ls` and `locate`.

use printlib::{LibraryConfig, LibraryProvider};

use super::common::{build_selector, navigate};
use crate::error::CliError;

/// List the registered providers in registry order.
pub fn run_providers(config: &LibraryConfig) -> Result<(), CliError> {
    let selector = build_selector(config)?;

    println!("Providers ({})", selector.registry().len());
    println!("=============");
    for (index, provider) in selector.registry().iter().enumerate() {
        println!("  {:>2}  {:<20} {}", index, provider.name(), provider.provider_key());
    }
    Ok(())
}

/// List collections and items of the view reached through `path`.
pub fn run_ls(config: &LibraryConfig, path: &[String]) -> Result<(), CliError> {
    let selector = build_selector(config)?;
    navigate(&selector, path)?;

    for index in 0..selector.collection_count() {
        println!("{}/", selector.collection_at(index)?.name);
    }
    for index in 0..selector.item_count() {
        let item = selector.item_at(index)?;
        match &item.file_location {
            Some(location) => println!("{}  ({})", item.name, location.display()),
            None => println!("{}", item.name),
        }
    }
    Ok(())
}

/// Print the encoded locator of the view reached through `path`.
pub fn run_locate(config: &LibraryConfig, path: &[String]) -> Result<(), CliError> {
    let selector = build_selector(config)?;
    navigate(&selector, path)?;

    let locator = selector.provider_locator();
    if locator.is_empty() {
        println!("(root)");
    } else {
        println!("{}", locator);
    }
    Ok(())
}
