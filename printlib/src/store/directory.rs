//! Directory-tree library provider.
//!
//! Presents a filesystem directory as a library: subdirectories are
//! collections, files with a recognised extension are items.
//!
//! # Keys
//!
//! Collection keys are absolute directory paths. The root collection's key
//! is the root directory itself, distinct from the provider key
//! (`directory:{root}`). Every path handed to the provider must stay inside
//! the root; anything else is rejected with [`LibraryError::OutsideRoot`].
//!
//! # Listing Cache
//!
//! The current directory is listed once per navigation, filter change or
//! mutation. Counts and positional access read the cached listing, so they
//! stay consistent with each other between refreshes.

use std::fs;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::collection::CollectionDescriptor;
use crate::error::{LibraryError, LibraryResult};
use crate::item::{ImportCallbacks, ImportOutcome, ImportProgress, ItemContent, ItemHandle};
use crate::locator::{LocatorPath, LocatorSegment};
use crate::notify::{ChangeNotifier, CollectionChanged};
use crate::provider::LibraryProvider;

/// File extensions listed as items when none are configured.
pub const DEFAULT_ITEM_EXTENSIONS: &[&str] = &["stl", "amf", "obj", "gcode"];

/// Prefix of directory provider keys.
pub const DIRECTORY_KEY_PREFIX: &str = "directory:";

#[derive(Debug, Default)]
struct Listing {
    collections: Vec<PathBuf>,
    items: Vec<PathBuf>,
}

#[derive(Debug)]
struct DirectoryState {
    current: PathBuf,
    keyword_filter: String,
    listing: Listing,
}

/// Library provider over a directory tree.
pub struct DirectoryProvider {
    name: String,
    provider_key: String,
    parent_key: Option<String>,
    root: PathBuf,
    extensions: Vec<String>,
    state: Mutex<DirectoryState>,
    notifier: ChangeNotifier,
}

impl DirectoryProvider {
    /// Open `root` as a library named `name`.
    ///
    /// The root must be an existing directory.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> LibraryResult<Self> {
        let root = root.into();
        let root = fs::canonicalize(&root).map_err(|e| LibraryError::io(&root, e))?;
        if !root.is_dir() {
            return Err(LibraryError::CollectionNotFound {
                key: root.display().to_string(),
            });
        }

        let provider_key = format!("{}{}", DIRECTORY_KEY_PREFIX, root.display());
        let provider = Self {
            name: name.into(),
            notifier: ChangeNotifier::new(provider_key.clone()),
            provider_key,
            parent_key: None,
            extensions: DEFAULT_ITEM_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            state: Mutex::new(DirectoryState {
                current: root.clone(),
                keyword_filter: String::new(),
                listing: Listing::default(),
            }),
            root,
        };
        provider.refresh()?;
        Ok(provider)
    }

    /// Record the key of the composite hosting this provider.
    pub fn with_parent_key(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    /// Replace the provider key (e.g. to serve as the canonical store).
    pub fn with_provider_key(mut self, provider_key: impl Into<String>) -> Self {
        self.provider_key = provider_key.into();
        self.notifier = ChangeNotifier::new(self.provider_key.clone());
        self
    }

    /// Restrict items to files with these extensions (case-insensitive).
    pub fn with_extensions<I, S>(self, extensions: I) -> LibraryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut provider = self;
        provider.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        provider.refresh()?;
        Ok(provider)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory currently shown.
    pub fn current_dir(&self) -> PathBuf {
        self.state.lock().current.clone()
    }

    fn root_key(&self) -> String {
        self.root.display().to_string()
    }

    fn is_item(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }

    /// List `directory` with `filter` applied, without touching state.
    fn list(&self, directory: &Path, filter: &str) -> LibraryResult<Listing> {
        let filter = filter.to_lowercase();
        let mut listing = Listing::default();

        let entries = fs::read_dir(directory).map_err(|e| LibraryError::io(directory, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| LibraryError::io(directory, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !filter.is_empty() && !name.contains(&filter) {
                continue;
            }
            if path.is_dir() {
                listing.collections.push(path);
            } else if self.is_item(&path) {
                listing.items.push(path);
            }
        }

        listing.collections.sort();
        listing.items.sort();
        Ok(listing)
    }

    /// Re-list the current directory.
    fn refresh(&self) -> LibraryResult<()> {
        let (current, filter) = {
            let state = self.state.lock();
            (state.current.clone(), state.keyword_filter.clone())
        };
        let listing = self.list(&current, &filter)?;
        self.state.lock().listing = listing;
        Ok(())
    }

    fn refresh_and_notify(&self) -> LibraryResult<()> {
        self.refresh()?;
        self.notifier.notify();
        Ok(())
    }

    /// Resolve a collection key to a directory inside the root.
    fn directory_for(&self, key: &str) -> LibraryResult<PathBuf> {
        if key == self.provider_key || key == self.root_key() {
            return Ok(self.root.clone());
        }
        let path = self.contained(Path::new(key))?;
        if !path.is_dir() {
            return Err(LibraryError::CollectionNotFound {
                key: key.to_string(),
            });
        }
        Ok(path)
    }

    /// Lexically normalize `path` and require it to live under the root.
    fn contained(&self, path: &Path) -> LibraryResult<PathBuf> {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::CurDir => {}
                other => normalized.push(other.as_os_str()),
            }
        }
        if !normalized.starts_with(&self.root) {
            return Err(LibraryError::OutsideRoot { path: path.to_path_buf() });
        }
        Ok(normalized)
    }

    /// Directory addressed by a save path; the current one when absent.
    fn destination(&self, save_path: Option<&LocatorPath>) -> LibraryResult<PathBuf> {
        let Some(path) = save_path.filter(|p| !p.is_empty()) else {
            return Ok(self.current_dir());
        };
        let rest = if path.starts_with_key(&self.provider_key) {
            path.without_first()
        } else {
            path.clone()
        };
        match rest.last() {
            Some(segment) => self.directory_for(&segment.key),
            None => Ok(self.root.clone()),
        }
    }

    fn child_path(&self, name: &str) -> LibraryResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.current_dir().join(name)),
            _ => Err(LibraryError::InvalidName(name.to_string())),
        }
    }

    fn locator_for(&self, directory: &Path) -> LocatorPath {
        let mut path = LocatorPath::new();
        if let Some(parent) = &self.parent_key {
            path.push(LocatorSegment::new(parent.clone(), ".."));
        }
        path.push(LocatorSegment::new(self.provider_key.clone(), self.name.clone()));

        if let Ok(relative) = directory.strip_prefix(&self.root) {
            let mut walked = self.root.clone();
            for component in relative.components() {
                walked.push(component.as_os_str());
                path.push(LocatorSegment::new(
                    walked.display().to_string(),
                    component.as_os_str().to_string_lossy().into_owned(),
                ));
            }
        }
        path
    }

    fn descriptor_for(&self, directory: &Path) -> CollectionDescriptor {
        if directory == self.root {
            return CollectionDescriptor::new(self.name.clone(), self.root_key());
        }
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        CollectionDescriptor::new(name, directory.display().to_string())
    }

    fn copy_into(&self, source: &Path, directory: &Path) -> LibraryResult<PathBuf> {
        let file_name = source
            .file_name()
            .ok_or_else(|| LibraryError::InvalidName(source.display().to_string()))?;
        let target = directory.join(file_name);
        fs::copy(source, &target).map_err(|e| LibraryError::io(source, e))?;
        Ok(target)
    }
}

impl LibraryProvider for DirectoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_key(&self) -> &str {
        &self.provider_key
    }

    fn collection_count(&self) -> usize {
        self.state.lock().listing.collections.len()
    }

    fn item_count(&self) -> usize {
        self.state.lock().listing.items.len()
    }

    fn keyword_filter(&self) -> String {
        self.state.lock().keyword_filter.clone()
    }

    fn set_keyword_filter(&self, filter: &str) {
        let current = self.current_dir();
        match self.list(&current, filter) {
            Ok(listing) => {
                let mut state = self.state.lock();
                state.keyword_filter = filter.to_string();
                state.listing = listing;
            }
            Err(e) => {
                warn!(provider = %self.provider_key, error = %e, "Failed to apply keyword filter");
                return;
            }
        }
        self.notifier.notify();
    }

    fn collection_at(&self, index: usize) -> LibraryResult<CollectionDescriptor> {
        let state = self.state.lock();
        let collections = &state.listing.collections;
        let path = collections.get(index).ok_or(LibraryError::IndexOutOfRange {
            index,
            count: collections.len(),
        })?;
        Ok(self.descriptor_for(path))
    }

    fn item_at(&self, index: usize) -> LibraryResult<ItemHandle> {
        let (path, current) = {
            let state = self.state.lock();
            let items = &state.listing.items;
            let path = items.get(index).ok_or(LibraryError::IndexOutOfRange {
                index,
                count: items.len(),
            })?;
            (path.clone(), state.current.clone())
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(
            ItemHandle::new(path.display().to_string(), name, self.locator_for(&current))
                .with_file_location(path),
        )
    }

    fn parent_collection(&self) -> Option<CollectionDescriptor> {
        let current = self.current_dir();
        if current == self.root {
            return self.parent_key.as_deref().map(CollectionDescriptor::parent_of);
        }
        current.parent().map(|parent| self.descriptor_for(parent))
    }

    fn provider_locator(&self) -> LocatorPath {
        self.locator_for(&self.current_dir())
    }

    fn add_collection(&self, name: &str) -> LibraryResult<()> {
        let path = self.child_path(name)?;
        fs::create_dir(&path).map_err(|e| LibraryError::io(&path, e))?;
        debug!(provider = %self.provider_key, path = %path.display(), "Directory created");
        self.refresh_and_notify()
    }

    fn remove_collection(&self, name: &str) -> LibraryResult<()> {
        let path = self.child_path(name)?;
        if !path.is_dir() {
            return Err(LibraryError::CollectionNotFound {
                key: path.display().to_string(),
            });
        }
        fs::remove_dir_all(&path).map_err(|e| LibraryError::io(&path, e))?;
        debug!(provider = %self.provider_key, path = %path.display(), "Directory removed");
        self.refresh_and_notify()
    }

    fn add_items(
        &self,
        files: &[PathBuf],
        save_path: &LocatorPath,
        callbacks: ImportCallbacks,
    ) -> LibraryResult<()> {
        let directory = self.destination(Some(save_path))?;
        let total = files.len();
        let mut outcome = ImportOutcome::default();

        for (i, source) in files.iter().enumerate() {
            match self.copy_into(source, &directory) {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    warn!(provider = %self.provider_key, file = %source.display(), error = %e, "Import failed");
                    outcome.failed.push((source.clone(), e.to_string()));
                }
            }
            callbacks.report(&ImportProgress {
                completed: i + 1,
                total,
                current: Some(source.clone()),
            });
        }

        debug!(
            provider = %self.provider_key,
            directory = %directory.display(),
            imported = outcome.imported,
            failed = outcome.failed.len(),
            "Import finished"
        );
        self.refresh_and_notify()?;
        callbacks.complete(&outcome);
        Ok(())
    }

    fn add_item(&self, item: &ItemHandle) -> LibraryResult<()> {
        let source = item
            .file_location
            .as_deref()
            .ok_or_else(|| LibraryError::ItemNotFound { id: item.id.clone() })?;
        self.copy_into(source, &self.current_dir())?;
        self.refresh_and_notify()
    }

    fn remove_item(&self, item: &ItemHandle) -> LibraryResult<()> {
        let location = item
            .file_location
            .as_deref()
            .ok_or_else(|| LibraryError::ItemNotFound { id: item.id.clone() })?;
        let path = self.contained(location)?;
        fs::remove_file(&path).map_err(|e| LibraryError::io(&path, e))?;
        debug!(provider = %self.provider_key, path = %path.display(), "File removed");
        self.refresh_and_notify()
    }

    fn save_item(
        &self,
        item: &ItemHandle,
        content: ItemContent,
        save_path: Option<&LocatorPath>,
    ) -> LibraryResult<()> {
        let existing = item
            .file_location
            .as_deref()
            .and_then(|p| self.contained(p).ok())
            .filter(|p| p.is_file());

        let path = match existing {
            Some(path) => path,
            None => {
                let directory = self.destination(save_path)?;
                let file_name = Path::new(&item.name)
                    .file_name()
                    .ok_or_else(|| LibraryError::InvalidName(item.name.clone()))?;
                directory.join(file_name)
            }
        };

        fs::write(&path, &content).map_err(|e| LibraryError::io(&path, e))?;
        self.refresh_and_notify()
    }

    fn set_collection_base(&self, collection: &CollectionDescriptor) -> LibraryResult<()> {
        let directory = self.directory_for(&collection.key)?;
        let filter = self.state.lock().keyword_filter.clone();
        let listing = self.list(&directory, &filter)?;
        debug!(provider = %self.provider_key, directory = %directory.display(), "Collection base set");
        {
            let mut state = self.state.lock();
            state.current = directory;
            state.listing = listing;
        }
        self.notifier.notify();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CollectionChanged> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library() -> (TempDir, DirectoryProvider) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Gears")).unwrap();
        fs::create_dir(dir.path().join("Brackets")).unwrap();
        fs::write(dir.path().join("benchy.stl"), b"solid").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        let provider = DirectoryProvider::new(dir.path(), "Downloads")
            .unwrap()
            .with_parent_key("sel");
        (dir, provider)
    }

    #[test]
    fn test_lists_directories_and_matching_files() {
        let (_dir, p) = library();
        assert_eq!(p.collection_count(), 2);
        assert_eq!(p.item_count(), 1);
        assert_eq!(p.collection_at(0).unwrap().name, "Brackets");
        assert_eq!(p.item_at(0).unwrap().name, "benchy.stl");
        assert!(p.provider_key().starts_with(DIRECTORY_KEY_PREFIX));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = DirectoryProvider::new(dir.path().join("absent"), "x");
        assert!(matches!(result, Err(LibraryError::Io { .. })));
    }

    #[test]
    fn test_navigation_round_trip() {
        let (_dir, p) = library();
        assert_eq!(p.parent_collection(), Some(CollectionDescriptor::parent_of("sel")));

        let gears = p.collection_at(1).unwrap();
        p.set_collection_base(&gears).unwrap();
        assert_eq!(p.collection_count(), 0);

        let parent = p.parent_collection().unwrap();
        assert_eq!(parent.name, "Downloads");
        assert_eq!(parent.key, p.root().display().to_string());

        let locator = p.provider_locator();
        assert_eq!(locator.len(), 3);
        assert_eq!(locator.last().unwrap().display_name, "Gears");

        p.set_collection_base(&parent).unwrap();
        assert_eq!(p.current_dir(), p.root());
    }

    #[test]
    fn test_paths_outside_root_are_rejected() {
        let (dir, p) = library();
        let escape = dir.path().join("Gears").join("..").join("..");
        let err = p
            .set_collection_base(&CollectionDescriptor::new("up", escape.display().to_string()))
            .unwrap_err();
        assert!(matches!(err, LibraryError::OutsideRoot { .. }));
        assert!(matches!(p.add_collection("../evil"), Err(LibraryError::InvalidName(_))));
    }

    #[test]
    fn test_keyword_filter() {
        let (_dir, p) = library();
        p.set_keyword_filter("gear");
        assert_eq!(p.collection_count(), 1);
        assert_eq!(p.item_count(), 0);
    }

    #[test]
    fn test_failed_listing_keeps_previous_view() {
        let (_dir, p) = library();
        let gears = p.root().join("Gears");
        p.set_collection_base(&CollectionDescriptor::new("Gears", gears.display().to_string()))
            .unwrap();
        let before = p.current_dir();
        fs::remove_dir(&gears).unwrap();
        let mut rx = p.subscribe();

        p.set_keyword_filter("cube");
        assert_eq!(p.keyword_filter(), "");
        assert!(rx.try_recv().is_err());

        let err = p
            .set_collection_base(&CollectionDescriptor::new("Gone", before.display().to_string()))
            .unwrap_err();
        assert!(matches!(err, LibraryError::CollectionNotFound { .. }));
        assert_eq!(p.current_dir(), before);
    }

    #[test]
    fn test_collection_lifecycle() {
        let (_dir, p) = library();
        p.add_collection("Spools").unwrap();
        assert_eq!(p.collection_count(), 3);
        p.remove_collection("Spools").unwrap();
        assert_eq!(p.collection_count(), 2);
        assert!(matches!(
            p.remove_collection("Spools"),
            Err(LibraryError::CollectionNotFound { .. })
        ));
    }

    #[test]
    fn test_add_items_copies_into_save_path() {
        let (_dir, p) = library();
        let outside = TempDir::new().unwrap();
        let source = outside.path().join("cube.stl");
        fs::write(&source, b"solid cube").unwrap();

        let gears = p.collection_at(1).unwrap();
        let save_path = LocatorPath::from(vec![
            LocatorSegment::new(p.provider_key(), "Downloads"),
            gears.to_segment(),
        ]);
        p.add_items(&[source], &save_path, ImportCallbacks::none()).unwrap();

        p.set_collection_base(&gears).unwrap();
        assert_eq!(p.item_count(), 1);
    }

    #[test]
    fn test_save_and_remove_item() {
        let (_dir, p) = library();
        let item = p.item_at(0).unwrap();
        p.save_item(&item, ItemContent::from_static(b"solid v2"), None)
            .unwrap();
        let location = item.file_location.clone().unwrap();
        assert_eq!(fs::read(&location).unwrap(), b"solid v2");

        p.remove_item(&item).unwrap();
        assert_eq!(p.item_count(), 0);
        assert!(!location.exists());
    }

    #[test]
    fn test_save_new_item_into_current_directory() {
        let (_dir, p) = library();
        let item = ItemHandle::new("", "part.gcode", LocatorPath::new());
        p.save_item(&item, ItemContent::from_static(b"G28"), None).unwrap();
        assert_eq!(p.item_count(), 2);
    }
}
