//! PrintLib - one navigable library over many content stores
//!
//! This library presents several independently implemented backends (a
//! canonical database-backed store, directory trees, plugin-supplied stores)
//! as a single hierarchy of collections and items.
//!
//! The centre piece is [`ProviderSelector`], a composite router that is
//! itself a [`LibraryProvider`]. It forwards every call to the right backend
//! with the right residual [`LocatorPath`] and tracks where the caller
//! currently is with a breadcrumb stack.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use printlib::{LibraryProvider, ProviderRegistry, ProviderSelector, Selection};
//! use printlib::store::MemoryProvider;
//!
//! let database = Arc::new(MemoryProvider::database("Library"));
//! let registry = ProviderRegistry::builder("ProviderSelectorKey", database).build();
//! let selector = ProviderSelector::new(registry);
//!
//! // At the root every provider shows up as a collection.
//! assert_eq!(selector.collection_count(), 1);
//!
//! let library = selector.collection_at(0).unwrap();
//! selector.set_collection_base(&library).unwrap();
//! assert_eq!(selector.selection(), Selection::Selected(0));
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod item;
pub mod locator;
pub mod logging;
pub mod notify;
pub mod provider;
pub mod registry;
pub mod selector;
pub mod store;

pub use collection::CollectionDescriptor;
pub use config::{ConfigError, DirectoryRootConfig, LibraryConfig};
pub use error::{LibraryError, LibraryResult};
pub use item::{
    CompletionCallback, ImportCallbacks, ImportOutcome, ImportProgress, ItemContent, ItemHandle,
    ProgressCallback,
};
pub use locator::{LocatorParseError, LocatorPath, LocatorSegment};
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use notify::{ChangeNotifier, CollectionChanged};
pub use provider::{
    LibraryProvider, PluginDiscovery, ProviderPlugin, StaticPluginDiscovery,
    DATABASE_PROVIDER_KEY,
};
pub use registry::{ProviderRegistry, ProviderRegistryBuilder};
pub use selector::{
    Breadcrumbs, ProviderSelector, Route, Selection, SELECTOR_NAME, SELECTOR_PROVIDER_KEY,
};
