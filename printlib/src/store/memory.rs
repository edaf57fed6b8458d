//! In-memory library provider.
//!
//! Holds a tree of collections and items entirely in memory. It is the
//! reference implementation of [`LibraryProvider`] and stands in for the
//! canonical database-backed store in tests and demos.
//!
//! # Keys
//!
//! Collection keys are slash-separated name paths inside the provider's own
//! namespace: the root collection is `/`, a child `/Gears`, a grandchild
//! `/Gears/Small`. The root key is deliberately distinct from the provider
//! key so that "go to my root" can be told apart from "enter this provider".

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::collection::CollectionDescriptor;
use crate::error::{LibraryError, LibraryResult};
use crate::item::{ImportCallbacks, ImportOutcome, ImportProgress, ItemContent, ItemHandle};
use crate::locator::{LocatorPath, LocatorSegment};
use crate::notify::{ChangeNotifier, CollectionChanged};
use crate::provider::{LibraryProvider, DATABASE_PROVIDER_KEY};

/// Key of every memory provider's root collection.
pub const MEMORY_ROOT_KEY: &str = "/";

#[derive(Debug, Clone)]
struct MemoryItem {
    id: String,
    name: String,
    content: ItemContent,
    file_location: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct MemoryCollection {
    name: String,
    collections: Vec<MemoryCollection>,
    items: Vec<MemoryItem>,
}

impl MemoryCollection {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&MemoryCollection> {
        self.collections.iter().find(|c| c.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut MemoryCollection> {
        self.collections.iter_mut().find(|c| c.name == name)
    }

    fn find_item(&self, id: &str) -> Option<&MemoryItem> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .or_else(|| self.collections.iter().find_map(|c| c.find_item(id)))
    }

    fn find_item_mut(&mut self, id: &str) -> Option<&mut MemoryItem> {
        if let Some(pos) = self.items.iter().position(|i| i.id == id) {
            return self.items.get_mut(pos);
        }
        self.collections
            .iter_mut()
            .find_map(|c| c.find_item_mut(id))
    }

    fn remove_item(&mut self, id: &str) -> bool {
        if let Some(pos) = self.items.iter().position(|i| i.id == id) {
            self.items.remove(pos);
            return true;
        }
        self.collections.iter_mut().any(|c| c.remove_item(id))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    root: MemoryCollection,
    /// Names from the root to the current collection.
    position: Vec<String>,
    keyword_filter: String,
}

impl MemoryState {
    fn resolve(&self, position: &[String]) -> Option<&MemoryCollection> {
        position
            .iter()
            .try_fold(&self.root, |collection, name| collection.child(name))
    }

    fn resolve_mut(&mut self, position: &[String]) -> Option<&mut MemoryCollection> {
        position
            .iter()
            .try_fold(&mut self.root, |collection, name| collection.child_mut(name))
    }

    fn current(&self) -> &MemoryCollection {
        // The position is only ever set to a resolvable path.
        self.resolve(&self.position).unwrap_or(&self.root)
    }

    fn visible_collections(&self) -> Vec<&MemoryCollection> {
        let filter = self.keyword_filter.to_lowercase();
        self.current()
            .collections
            .iter()
            .filter(|c| matches_filter(&c.name, &filter))
            .collect()
    }

    fn visible_items(&self) -> Vec<&MemoryItem> {
        let filter = self.keyword_filter.to_lowercase();
        self.current()
            .items
            .iter()
            .filter(|i| matches_filter(&i.name, &filter))
            .collect()
    }
}

fn matches_filter(name: &str, lowercase_filter: &str) -> bool {
    lowercase_filter.is_empty() || name.to_lowercase().contains(lowercase_filter)
}

fn key_for(position: &[String]) -> String {
    if position.is_empty() {
        MEMORY_ROOT_KEY.to_string()
    } else {
        format!("/{}", position.join("/"))
    }
}

fn position_for(key: &str) -> Option<Vec<String>> {
    let rest = key.strip_prefix('/')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    Some(rest.split('/').map(str::to_string).collect())
}

fn validate_name(name: &str) -> LibraryResult<()> {
    if name.is_empty() || name.contains('/') || name == ".." {
        return Err(LibraryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// In-memory tree of collections and items.
pub struct MemoryProvider {
    name: String,
    provider_key: String,
    parent_key: Option<String>,
    state: Mutex<MemoryState>,
    next_id: AtomicU64,
    notifier: ChangeNotifier,
}

impl MemoryProvider {
    /// Create an empty provider.
    pub fn new(name: impl Into<String>, provider_key: impl Into<String>) -> Self {
        let provider_key = provider_key.into();
        Self {
            name: name.into(),
            notifier: ChangeNotifier::new(provider_key.clone()),
            provider_key,
            parent_key: None,
            state: Mutex::new(MemoryState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create an empty provider carrying the canonical database key.
    pub fn database(name: impl Into<String>) -> Self {
        Self::new(name, DATABASE_PROVIDER_KEY)
    }

    /// Record the key of the composite hosting this provider.
    pub fn with_parent_key(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    /// Insert an item directly into the collection with `collection_key`.
    pub fn insert_item(
        &self,
        collection_key: &str,
        name: &str,
        content: ItemContent,
    ) -> LibraryResult<ItemHandle> {
        let position = self.position_of(collection_key)?;
        let item = MemoryItem {
            id: self.allocate_id(),
            name: name.to_string(),
            content,
            file_location: None,
        };
        let handle = self.handle_for(&position, &item);
        {
            let mut state = self.state.lock();
            let collection = state
                .resolve_mut(&position)
                .ok_or_else(|| LibraryError::CollectionNotFound {
                    key: collection_key.to_string(),
                })?;
            collection.items.push(item);
        }
        self.notifier.notify();
        Ok(handle)
    }

    /// Content of the item with `id`, wherever it lives.
    pub fn item_content(&self, id: &str) -> Option<ItemContent> {
        self.state.lock().root.find_item(id).map(|i| i.content.clone())
    }

    /// Key of the current collection.
    pub fn current_key(&self) -> String {
        key_for(&self.state.lock().position)
    }

    fn allocate_id(&self) -> String {
        format!("{}#{}", self.provider_key, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn position_of(&self, key: &str) -> LibraryResult<Vec<String>> {
        if key == self.provider_key {
            return Ok(Vec::new());
        }
        let not_found = || LibraryError::CollectionNotFound {
            key: key.to_string(),
        };
        let position = position_for(key).ok_or_else(not_found)?;
        if self.state.lock().resolve(&position).is_none() {
            return Err(not_found());
        }
        Ok(position)
    }

    /// Destination of a save path handed down by a composite.
    ///
    /// The path may start with this provider's own key; the last remaining
    /// segment names the target collection. A path naming only this provider
    /// means its root, no path at all means the current collection.
    fn destination(&self, save_path: Option<&LocatorPath>) -> LibraryResult<Vec<String>> {
        let Some(path) = save_path.filter(|p| !p.is_empty()) else {
            return Ok(self.state.lock().position.clone());
        };
        let rest = if path.starts_with_key(&self.provider_key) {
            path.without_first()
        } else {
            path.clone()
        };
        match rest.last() {
            Some(segment) => self.position_of(&segment.key),
            None => Ok(Vec::new()),
        }
    }

    fn locator_for(&self, position: &[String]) -> LocatorPath {
        let mut path = LocatorPath::new();
        if let Some(parent) = &self.parent_key {
            path.push(LocatorSegment::new(parent.clone(), ".."));
        }
        path.push(LocatorSegment::new(self.provider_key.clone(), self.name.clone()));
        for depth in 1..=position.len() {
            path.push(LocatorSegment::new(
                key_for(&position[..depth]),
                position[depth - 1].clone(),
            ));
        }
        path
    }

    fn handle_for(&self, position: &[String], item: &MemoryItem) -> ItemHandle {
        let handle = ItemHandle::new(item.id.clone(), item.name.clone(), self.locator_for(position));
        match &item.file_location {
            Some(path) => handle.with_file_location(path.clone()),
            None => handle,
        }
    }

    fn import_file(&self, path: &Path) -> Result<MemoryItem, String> {
        let content = fs::read(path).map_err(|e| e.to_string())?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| "path has no file name".to_string())?;
        Ok(MemoryItem {
            id: self.allocate_id(),
            name,
            content: ItemContent::from(content),
            file_location: Some(path.to_path_buf()),
        })
    }
}

impl LibraryProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_key(&self) -> &str {
        &self.provider_key
    }

    fn collection_count(&self) -> usize {
        self.state.lock().visible_collections().len()
    }

    fn item_count(&self) -> usize {
        self.state.lock().visible_items().len()
    }

    fn keyword_filter(&self) -> String {
        self.state.lock().keyword_filter.clone()
    }

    fn set_keyword_filter(&self, filter: &str) {
        self.state.lock().keyword_filter = filter.to_string();
        self.notifier.notify();
    }

    fn collection_at(&self, index: usize) -> LibraryResult<CollectionDescriptor> {
        let state = self.state.lock();
        let visible = state.visible_collections();
        let collection = visible.get(index).ok_or(LibraryError::IndexOutOfRange {
            index,
            count: visible.len(),
        })?;
        let mut position = state.position.clone();
        position.push(collection.name.clone());
        Ok(CollectionDescriptor::new(
            collection.name.clone(),
            key_for(&position),
        ))
    }

    fn item_at(&self, index: usize) -> LibraryResult<ItemHandle> {
        let state = self.state.lock();
        let visible = state.visible_items();
        let item = visible.get(index).ok_or(LibraryError::IndexOutOfRange {
            index,
            count: visible.len(),
        })?;
        Ok(self.handle_for(&state.position, item))
    }

    fn parent_collection(&self) -> Option<CollectionDescriptor> {
        let state = self.state.lock();
        match state.position.len() {
            0 => self.parent_key.as_deref().map(CollectionDescriptor::parent_of),
            1 => Some(CollectionDescriptor::new(self.name.clone(), MEMORY_ROOT_KEY)),
            depth => {
                let parent = &state.position[..depth - 1];
                Some(CollectionDescriptor::new(
                    parent[depth - 2].clone(),
                    key_for(parent),
                ))
            }
        }
    }

    fn provider_locator(&self) -> LocatorPath {
        let position = self.state.lock().position.clone();
        self.locator_for(&position)
    }

    fn add_collection(&self, name: &str) -> LibraryResult<()> {
        validate_name(name)?;
        {
            let mut state = self.state.lock();
            let position = state.position.clone();
            let current = state
                .resolve_mut(&position)
                .ok_or_else(|| LibraryError::CollectionNotFound {
                    key: key_for(&position),
                })?;
            if current.child(name).is_some() {
                return Err(LibraryError::InvalidName(format!("{} already exists", name)));
            }
            current.collections.push(MemoryCollection::named(name));
        }
        debug!(provider = %self.provider_key, collection = name, "Collection added");
        self.notifier.notify();
        Ok(())
    }

    fn remove_collection(&self, name: &str) -> LibraryResult<()> {
        {
            let mut state = self.state.lock();
            let position = state.position.clone();
            let current = state
                .resolve_mut(&position)
                .ok_or_else(|| LibraryError::CollectionNotFound {
                    key: key_for(&position),
                })?;
            let before = current.collections.len();
            current.collections.retain(|c| c.name != name);
            if current.collections.len() == before {
                let mut missing = position;
                missing.push(name.to_string());
                return Err(LibraryError::CollectionNotFound {
                    key: key_for(&missing),
                });
            }
        }
        debug!(provider = %self.provider_key, collection = name, "Collection removed");
        self.notifier.notify();
        Ok(())
    }

    fn add_items(
        &self,
        files: &[PathBuf],
        save_path: &LocatorPath,
        callbacks: ImportCallbacks,
    ) -> LibraryResult<()> {
        let destination = self.destination(Some(save_path))?;
        let total = files.len();
        let mut outcome = ImportOutcome::default();
        let mut imported = Vec::with_capacity(total);

        for (i, path) in files.iter().enumerate() {
            match self.import_file(path) {
                Ok(item) => imported.push(item),
                Err(reason) => {
                    warn!(provider = %self.provider_key, file = %path.display(), %reason, "Import failed");
                    outcome.failed.push((path.clone(), reason));
                }
            }
            callbacks.report(&ImportProgress {
                completed: i + 1,
                total,
                current: Some(path.clone()),
            });
        }

        outcome.imported = imported.len();
        {
            let mut state = self.state.lock();
            let key = key_for(&destination);
            let collection = state
                .resolve_mut(&destination)
                .ok_or(LibraryError::CollectionNotFound { key })?;
            collection.items.extend(imported);
        }

        debug!(
            provider = %self.provider_key,
            imported = outcome.imported,
            failed = outcome.failed.len(),
            "Import finished"
        );
        self.notifier.notify();
        callbacks.complete(&outcome);
        Ok(())
    }

    fn add_item(&self, item: &ItemHandle) -> LibraryResult<()> {
        let content = match item.file_location.as_deref() {
            Some(path) => {
                ItemContent::from(fs::read(path).map_err(|e| LibraryError::io(path, e))?)
            }
            None => ItemContent::new(),
        };
        let record = MemoryItem {
            id: self.allocate_id(),
            name: item.name.clone(),
            content,
            file_location: item.file_location.clone(),
        };
        {
            let mut state = self.state.lock();
            let position = state.position.clone();
            let current = state
                .resolve_mut(&position)
                .ok_or_else(|| LibraryError::CollectionNotFound {
                    key: key_for(&position),
                })?;
            current.items.push(record);
        }
        self.notifier.notify();
        Ok(())
    }

    fn remove_item(&self, item: &ItemHandle) -> LibraryResult<()> {
        if !self.state.lock().root.remove_item(&item.id) {
            return Err(LibraryError::ItemNotFound {
                id: item.id.clone(),
            });
        }
        debug!(provider = %self.provider_key, item = %item.id, "Item removed");
        self.notifier.notify();
        Ok(())
    }

    fn save_item(
        &self,
        item: &ItemHandle,
        content: ItemContent,
        save_path: Option<&LocatorPath>,
    ) -> LibraryResult<()> {
        let updated = {
            let mut state = self.state.lock();
            match state.root.find_item_mut(&item.id) {
                Some(existing) => {
                    existing.content = content.clone();
                    true
                }
                None => false,
            }
        };

        if !updated {
            let destination = self.destination(save_path)?;
            let id = if item.id.is_empty() {
                self.allocate_id()
            } else {
                item.id.clone()
            };
            let mut state = self.state.lock();
            let key = key_for(&destination);
            let collection = state
                .resolve_mut(&destination)
                .ok_or(LibraryError::CollectionNotFound { key })?;
            collection.items.push(MemoryItem {
                id,
                name: item.name.clone(),
                content,
                file_location: item.file_location.clone(),
            });
        }

        self.notifier.notify();
        Ok(())
    }

    fn set_collection_base(&self, collection: &CollectionDescriptor) -> LibraryResult<()> {
        let position = self.position_of(&collection.key)?;
        debug!(provider = %self.provider_key, key = %collection.key, "Collection base set");
        self.state.lock().position = position;
        self.notifier.notify();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CollectionChanged> {
        self.notifier.subscribe()
    }
}
