//! Composite router over a provider registry.
//!
//! [`ProviderSelector`] presents several independent providers as one
//! navigable hierarchy and is itself a [`LibraryProvider`], so selectors
//! nest.
//!
//! # Dispatch
//!
//! ```text
//!                 ┌───────────────────────────────┐
//!   call ────────►│        ProviderSelector       │
//!                 │  selection: Unselected | i    │
//!                 │  breadcrumbs: [.., a, b]      │
//!                 └───────┬───────────────┬───────┘
//!            Unselected   │               │  Selected(i)
//!                         ▼               ▼
//!              answer from registry   forward to registry[i]
//!              (providers as folders)
//! ```
//!
//! Calls that carry a locator or an item handle are routed with
//! [`ProviderSelector::resolve_provider`] instead: segment 1 of the path
//! names the owning provider, which receives the path minus segment 0.
//!
//! # Navigation
//!
//! [`LibraryProvider::set_collection_base`] is the only transition of the
//! navigation state. Whether the caller went up or down is reconstructed
//! from keys alone (see [`NavigationState::stack_move`]).

mod state;

pub use state::{Breadcrumbs, NavigationState, Selection, StackMove};

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::collection::{CollectionDescriptor, PARENT_COLLECTION_NAME};
use crate::config::LibraryConfig;
use crate::error::{LibraryError, LibraryResult};
use crate::item::{ImportCallbacks, ItemContent, ItemHandle};
use crate::locator::{LocatorPath, LocatorSegment};
use crate::notify::{ChangeNotifier, CollectionChanged};
use crate::provider::{LibraryProvider, PluginDiscovery};
use crate::registry::ProviderRegistry;

/// Default key of the top-level selector.
pub const SELECTOR_PROVIDER_KEY: &str = "ProviderSelectorKey";

/// Name reported by the selector. The root is never shown as a folder.
pub const SELECTOR_NAME: &str = "Never visible";

/// Where a locator or item routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Registry index of the owning provider.
    pub index: usize,
    /// Path to hand to that provider; empty on fallback.
    pub sub_path: LocatorPath,
}

/// Composite router: the provider of providers.
pub struct ProviderSelector {
    registry: ProviderRegistry,
    parent_key: Option<String>,
    state: Mutex<NavigationState>,
    notifier: ChangeNotifier,
}

impl ProviderSelector {
    /// Create a selector over `registry`, keyed by the registry's host key.
    pub fn new(registry: ProviderRegistry) -> Self {
        let key = registry.host_key().to_string();
        Self {
            state: Mutex::new(NavigationState::new(&key)),
            notifier: ChangeNotifier::new(key),
            registry,
            parent_key: None,
        }
    }

    /// Record the key of the composite hosting this selector.
    ///
    /// The root view then reports that composite as its parent, like any
    /// other backend does at its root.
    pub fn with_parent_key(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    /// Build the standard registry from configuration.
    ///
    /// Provider 0 is `database`, followed by the configured directory roots
    /// and the providers produced by `discovery`.
    pub fn from_config(
        config: &LibraryConfig,
        database: Arc<dyn LibraryProvider>,
        discovery: &dyn PluginDiscovery,
    ) -> Self {
        let registry = ProviderRegistry::builder(config.selector_key(), database)
            .add_directories(&config.directories)
            .discover_plugins(discovery)
            .build();
        Self::new(registry)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn selection(&self) -> Selection {
        self.state.lock().selection
    }

    /// Snapshot of the breadcrumb stack.
    pub fn breadcrumbs(&self) -> Breadcrumbs {
        self.state.lock().breadcrumbs.clone()
    }

    /// The currently selected provider, if any.
    pub fn active_provider(&self) -> Option<Arc<dyn LibraryProvider>> {
        let index = self.state.lock().selection.index()?;
        self.registry.get(index).cloned()
    }

    /// Route a locator to the provider owning it.
    ///
    /// Segment 0 is this selector; segment 1 names the child. The child
    /// receives the path without segment 0, so its own key leads. Short or
    /// unmatched paths fall back to provider 0 with an empty sub-path.
    pub fn resolve_provider(&self, path: &LocatorPath) -> Route {
        if let Some(segment) = path.segment(1) {
            if let Some(index) = self.registry.position(&segment.key) {
                return Route {
                    index,
                    sub_path: path.without_first(),
                };
            }
            debug!(key = %segment.key, "Locator matches no provider, falling back to provider 0");
        }
        Route {
            index: 0,
            sub_path: LocatorPath::new(),
        }
    }

    fn provider(&self, index: usize) -> &Arc<dyn LibraryProvider> {
        // Indices come from `resolve_provider` or the selection, both of
        // which only produce registry positions.
        &self.registry[index]
    }

    fn routed(&self, path: &LocatorPath) -> (&Arc<dyn LibraryProvider>, LocatorPath) {
        let route = self.resolve_provider(path);
        (self.provider(route.index), route.sub_path)
    }

    /// Route an item by its own locator.
    ///
    /// The returned handle is re-addressed to the owning child's residual
    /// path so that a nested composite can route it one level further.
    fn routed_item(&self, item: &ItemHandle) -> (usize, ItemHandle) {
        let route = self.resolve_provider(item.library_provider_locator());
        let handle = if route.sub_path.is_empty() {
            item.clone()
        } else {
            item.clone().with_locator(route.sub_path)
        };
        (route.index, handle)
    }

    /// Run `f` on the selected provider, or fail as unsupported at the root.
    fn forward<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&dyn LibraryProvider) -> LibraryResult<T>,
    ) -> LibraryResult<T> {
        match self.active_provider() {
            Some(provider) => f(provider.as_ref()),
            None => Err(LibraryError::Unsupported { operation }),
        }
    }

    fn notify_after<T>(&self, result: LibraryResult<T>) -> LibraryResult<T> {
        if result.is_ok() {
            self.notifier.notify();
        }
        result
    }
}

impl LibraryProvider for ProviderSelector {
    fn name(&self) -> &str {
        SELECTOR_NAME
    }

    fn provider_key(&self) -> &str {
        self.registry.host_key()
    }

    fn collection_count(&self) -> usize {
        match self.active_provider() {
            Some(provider) => provider.collection_count(),
            None => self.registry.len(),
        }
    }

    fn item_count(&self) -> usize {
        match self.active_provider() {
            Some(provider) => provider.item_count(),
            None => 0,
        }
    }

    fn keyword_filter(&self) -> String {
        match self.active_provider() {
            Some(provider) => provider.keyword_filter(),
            None => String::new(),
        }
    }

    fn set_keyword_filter(&self, filter: &str) {
        if let Some(provider) = self.active_provider() {
            provider.set_keyword_filter(filter);
            self.notifier.notify();
        }
    }

    fn collection_at(&self, index: usize) -> LibraryResult<CollectionDescriptor> {
        match self.active_provider() {
            Some(provider) => provider.collection_at(index),
            None => {
                let provider = self.registry.get(index).ok_or(LibraryError::IndexOutOfRange {
                    index,
                    count: self.registry.len(),
                })?;
                Ok(CollectionDescriptor::new(
                    provider.name(),
                    provider.provider_key(),
                ))
            }
        }
    }

    fn item_at(&self, index: usize) -> LibraryResult<ItemHandle> {
        match self.active_provider() {
            Some(provider) => {
                let item = provider.item_at(index)?;
                let locator = item.library_provider_locator();
                if locator.is_empty() || locator.starts_with_key(self.provider_key()) {
                    return Ok(item);
                }
                // Handles from below a nested composite start at that
                // composite; anchor them here so they route back down.
                let locator: LocatorPath =
                    std::iter::once(LocatorSegment::new(self.provider_key(), PARENT_COLLECTION_NAME))
                        .chain(locator.iter().cloned())
                        .collect();
                Ok(item.with_locator(locator))
            }
            // Items addressed without a provider live in the canonical store.
            None => self.registry.canonical()?.item_at(index),
        }
    }

    fn parent_collection(&self) -> Option<CollectionDescriptor> {
        match self.active_provider() {
            Some(provider) => provider.parent_collection(),
            None => self.parent_key.as_deref().map(CollectionDescriptor::parent_of),
        }
    }

    fn provider_locator(&self) -> LocatorPath {
        let state = self.state.lock();
        match state.selection {
            Selection::Unselected => LocatorPath::new(),
            Selection::Selected(_) => state.breadcrumbs.to_locator(),
        }
    }

    fn add_collection(&self, name: &str) -> LibraryResult<()> {
        let result = self.forward("add_collection", |p| p.add_collection(name));
        self.notify_after(result)
    }

    fn remove_collection(&self, name: &str) -> LibraryResult<()> {
        let result = self.forward("remove_collection", |p| p.remove_collection(name));
        self.notify_after(result)
    }

    fn add_items(
        &self,
        files: &[PathBuf],
        save_path: &LocatorPath,
        callbacks: ImportCallbacks,
    ) -> LibraryResult<()> {
        let (provider, sub_path) = self.routed(save_path);
        debug!(provider = provider.provider_key(), files = files.len(), "Routing import");
        let result = provider.add_items(files, &sub_path, callbacks);
        self.notify_after(result)
    }

    fn add_item(&self, item: &ItemHandle) -> LibraryResult<()> {
        if !self.selection().is_selected() {
            return Err(LibraryError::Unsupported {
                operation: "add_item",
            });
        }
        let (index, item) = self.routed_item(item);
        let result = self.provider(index).add_item(&item);
        self.notify_after(result)
    }

    fn remove_item(&self, item: &ItemHandle) -> LibraryResult<()> {
        let (index, item) = self.routed_item(item);
        let provider = self.provider(index);
        debug!(provider = provider.provider_key(), item = %item.id, "Routing item removal");
        let result = provider.remove_item(&item);
        self.notify_after(result)
    }

    fn save_item(
        &self,
        item: &ItemHandle,
        content: ItemContent,
        save_path: Option<&LocatorPath>,
    ) -> LibraryResult<()> {
        if !self.selection().is_selected() {
            return Err(LibraryError::Unsupported {
                operation: "save_item",
            });
        }
        // The item's own locator picks the provider. A save path is only
        // honoured when it addresses that same provider.
        let (index, item) = self.routed_item(item);
        let target = save_path
            .map(|path| self.resolve_provider(path))
            .filter(|route| route.index == index && !route.sub_path.is_empty())
            .map(|route| route.sub_path)
            .unwrap_or_else(|| item.library_provider_locator().clone());
        let provider = self.provider(index);
        debug!(provider = provider.provider_key(), item = %item.id, "Routing item save");
        let result = provider.save_item(&item, content, Some(&target).filter(|p| !p.is_empty()));
        self.notify_after(result)
    }

    fn set_collection_base(&self, collection: &CollectionDescriptor) -> LibraryResult<()> {
        let mut state = self.state.lock();

        let selected_parent = state
            .selection
            .index()
            .and_then(|i| self.provider(i).parent_collection());
        let movement = state.stack_move(
            &collection.key,
            selected_parent.as_ref().map(|c| c.key.as_str()),
        );

        let selection = if collection.key == self.provider_key() {
            Selection::Unselected
        } else if let Some(index) = self.registry.position(&collection.key) {
            Selection::Selected(index)
        } else {
            // A collection inside the active provider.
            let index = state
                .selection
                .index()
                .ok_or_else(|| LibraryError::NoActiveProvider {
                    key: collection.key.clone(),
                })?;
            self.provider(index).set_collection_base(collection)?;
            Selection::Selected(index)
        };

        state.apply(movement, collection);
        state.selection = selection;
        info!(
            key = %collection.key,
            ?movement,
            %selection,
            depth = state.breadcrumbs.len(),
            "Collection base set"
        );
        drop(state);

        self.notifier.notify();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CollectionChanged> {
        self.notifier.subscribe()
    }
}
