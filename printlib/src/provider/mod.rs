//! Backend provider abstraction.
//!
//! Every content source (the canonical database-backed store, directory
//! trees, plugin-supplied stores, and the composite router itself) exposes
//! the same [`LibraryProvider`] capability. Callers navigate any provider
//! like a filesystem without knowing which backend stores an item.
//!
//! # Current View
//!
//! Providers are stateful: counts, positional access and the keyword filter
//! all refer to the provider's *current* collection, which changes through
//! [`LibraryProvider::set_collection_base`].
//!
//! # Thread Safety
//!
//! Providers are shared as `Arc<dyn LibraryProvider>` and must be
//! `Send + Sync`. Navigation state is expected to be driven by one caller at
//! a time; implementations only guarantee memory safety, not ordering
//! between concurrent navigations.

mod plugin;

pub use plugin::{PluginDiscovery, ProviderPlugin, StaticPluginDiscovery};

use std::path::PathBuf;

use tokio::sync::broadcast;

use crate::collection::CollectionDescriptor;
use crate::error::LibraryResult;
use crate::item::{ImportCallbacks, ItemContent, ItemHandle};
use crate::locator::LocatorPath;
use crate::notify::CollectionChanged;

/// Provider key of the canonical database-backed store.
///
/// Provider 0 of every registry is expected to carry this key.
pub const DATABASE_PROVIDER_KEY: &str = "LibraryProviderDatabaseKey";

/// Uniform collection/item access implemented by every backend.
pub trait LibraryProvider: Send + Sync {
    /// Display name of the provider.
    fn name(&self) -> &str;

    /// Stable key, unique among sibling providers of a registry.
    fn provider_key(&self) -> &str;

    /// Number of collections in the current view.
    fn collection_count(&self) -> usize;

    /// Number of items in the current view.
    fn item_count(&self) -> usize;

    /// Live filter applied to enumeration.
    fn keyword_filter(&self) -> String;

    /// Replace the keyword filter. Counts and enumeration follow.
    fn set_keyword_filter(&self, filter: &str);

    /// Collection at `index` in the current view.
    fn collection_at(&self, index: usize) -> LibraryResult<CollectionDescriptor>;

    /// Item at `index` in the current view.
    fn item_at(&self, index: usize) -> LibraryResult<ItemHandle>;

    /// The collection one level up, or `None` at the outermost root.
    fn parent_collection(&self) -> Option<CollectionDescriptor>;

    /// Full path from the composite root to the current position.
    fn provider_locator(&self) -> LocatorPath;

    /// Create a collection named `name` in the current view.
    fn add_collection(&self, name: &str) -> LibraryResult<()>;

    /// Remove the collection named `name` from the current view.
    fn remove_collection(&self, name: &str) -> LibraryResult<()>;

    /// Bulk-import files into the collection addressed by `save_path`.
    ///
    /// Long-running: callbacks are invoked by the importing backend.
    fn add_items(
        &self,
        files: &[PathBuf],
        save_path: &LocatorPath,
        callbacks: ImportCallbacks,
    ) -> LibraryResult<()>;

    /// Add an existing item to the current view.
    fn add_item(&self, item: &ItemHandle) -> LibraryResult<()>;

    /// Remove an item from the provider that owns it.
    fn remove_item(&self, item: &ItemHandle) -> LibraryResult<()>;

    /// Store new content for `item`, optionally into `save_path`.
    fn save_item(
        &self,
        item: &ItemHandle,
        content: ItemContent,
        save_path: Option<&LocatorPath>,
    ) -> LibraryResult<()>;

    /// Tell the provider "you are now here".
    fn set_collection_base(&self, collection: &CollectionDescriptor) -> LibraryResult<()>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<CollectionChanged>;
}
