//! Integration tests for composite navigation.
//!
//! These tests drive a [`ProviderSelector`] over real providers:
//! - the in-memory canonical store
//! - a directory provider over a temporary tree
//! - plugin-supplied providers and nested selectors
//!
//! Run with: `cargo test --test navigation`

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use printlib::store::MemoryProvider;
use printlib::{
    CollectionDescriptor, DirectoryRootConfig, ImportCallbacks, ItemContent, LibraryConfig,
    LibraryError, LibraryProvider, LocatorPath, LocatorSegment, ProviderPlugin,
    ProviderRegistry, ProviderSelector, Selection, StaticPluginDiscovery,
    DATABASE_PROVIDER_KEY, SELECTOR_PROVIDER_KEY,
};

// ============================================================================
// Helper Functions
// ============================================================================

struct ShelfPlugin;

impl ProviderPlugin for ShelfPlugin {
    fn plugin_name(&self) -> &str {
        "shelf"
    }

    fn create_provider(&self, parent_key: &str) -> Arc<dyn LibraryProvider> {
        Arc::new(MemoryProvider::new("Shelf", "plugin:shelf").with_parent_key(parent_key))
    }
}

/// A downloads tree with two printable files, one ignored file and a subfolder.
fn downloads_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cube.stl"), b"solid cube").unwrap();
    fs::write(dir.path().join("part.gcode"), b"G28").unwrap();
    fs::write(dir.path().join("notes.txt"), b"not a model").unwrap();
    fs::create_dir(dir.path().join("Brackets")).unwrap();
    fs::write(dir.path().join("Brackets").join("l.stl"), b"solid l").unwrap();
    dir
}

fn database() -> Arc<MemoryProvider> {
    let database =
        MemoryProvider::database("Library").with_parent_key(SELECTOR_PROVIDER_KEY);
    database.add_collection("Gears").unwrap();
    database
        .insert_item("/", "benchy.stl", ItemContent::from_static(b"solid benchy"))
        .unwrap();
    Arc::new(database)
}

/// Database, one directory provider and one plugin provider.
fn standard_selector(downloads: &TempDir) -> ProviderSelector {
    let config = LibraryConfig::new(downloads.path().join("store"))
        .with_directory(DirectoryRootConfig::new("Downloads", downloads.path()));
    let discovery = StaticPluginDiscovery::new().with_plugin(Arc::new(ShelfPlugin));
    ProviderSelector::from_config(&config, database(), &discovery)
}

fn descriptor_at(selector: &ProviderSelector, index: usize) -> CollectionDescriptor {
    selector.collection_at(index).unwrap()
}

fn enter(selector: &ProviderSelector, name: &str) -> CollectionDescriptor {
    let target = (0..selector.collection_count())
        .map(|i| descriptor_at(selector, i))
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no collection named {}", name));
    selector.set_collection_base(&target).unwrap();
    target
}

fn go_up(selector: &ProviderSelector) {
    let parent = selector.parent_collection().expect("already at the root");
    selector.set_collection_base(&parent).unwrap();
}

// ============================================================================
// Scenarios
// ============================================================================

/// A fresh router lists one collection per registered provider.
#[test]
fn test_fresh_router_lists_providers() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);

    assert_eq!(selector.selection(), Selection::Unselected);
    assert_eq!(selector.collection_count(), 3);

    let names: Vec<String> = (0..3).map(|i| descriptor_at(&selector, i).name).collect();
    assert_eq!(names, vec!["Library", "Downloads", "Shelf"]);
    assert_eq!(descriptor_at(&selector, 0).key, DATABASE_PROVIDER_KEY);
}

/// Selecting a provider by key delegates counts to it.
#[test]
fn test_selecting_directory_provider() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);

    let key = selector.registry().get(1).unwrap().provider_key().to_string();
    selector
        .set_collection_base(&CollectionDescriptor::new("Downloads", key))
        .unwrap();

    assert_eq!(selector.selection(), Selection::Selected(1));
    assert_eq!(selector.item_count(), 2);
    assert_eq!(selector.collection_count(), 1);
}

/// The composite's own key always returns to the root view.
#[test]
fn test_own_key_returns_to_root_from_any_depth() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);

    enter(&selector, "Downloads");
    enter(&selector, "Brackets");
    assert_eq!(selector.item_count(), 1);
    assert_eq!(selector.breadcrumbs().len(), 3);

    selector
        .set_collection_base(&CollectionDescriptor::new("Home", SELECTOR_PROVIDER_KEY))
        .unwrap();

    assert_eq!(selector.selection(), Selection::Unselected);
    assert_eq!(selector.collection_count(), 3);
}

/// Items requested at the root must come from the canonical store.
#[test]
fn test_item_at_root_requires_canonical_store() {
    let registry = ProviderRegistry::builder(
        "sel",
        Arc::new(MemoryProvider::new("Impostor", "memory:impostor")),
    )
    .build();
    let selector = ProviderSelector::new(registry);

    let err = selector.item_at(0).unwrap_err();
    assert!(matches!(err, LibraryError::NonCanonicalRoot { ref found, .. } if found == "memory:impostor"));
    assert!(err.is_invariant_violation());
}

/// Locators resolve one composite level at a time.
#[test]
fn test_nested_selector_routes_recursively() {
    let grandchild =
        Arc::new(MemoryProvider::new("Archive", "memory:archive").with_parent_key("inner"));
    grandchild.add_collection("Gears").unwrap();

    let inner = ProviderRegistry::builder(
        "inner",
        Arc::new(MemoryProvider::new("Inner root", "memory:inner-root")),
    )
    .add_provider(grandchild.clone())
    .build();
    let outer = ProviderRegistry::builder("outer", database())
        .add_provider(Arc::new(ProviderSelector::new(inner).with_parent_key("outer")))
        .build();
    let selector = ProviderSelector::new(outer);

    let path = LocatorPath::from(vec![
        LocatorSegment::new("outer", ".."),
        LocatorSegment::new("inner", "Inner"),
        LocatorSegment::new("memory:archive", "Archive"),
        LocatorSegment::new("/Gears", "Gears"),
    ]);

    let route = selector.resolve_provider(&path);
    assert_eq!(route.index, 1);
    assert_eq!(route.sub_path, path.without_first());

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("gear.stl");
    fs::write(&file, b"solid gear").unwrap();
    selector
        .add_items(&[file], &path, ImportCallbacks::none())
        .unwrap();

    grandchild
        .set_collection_base(&CollectionDescriptor::new("Gears", "/Gears"))
        .unwrap();
    assert_eq!(grandchild.item_count(), 1);
    assert_eq!(grandchild.item_at(0).unwrap().name, "gear.stl");
}

/// Outer router over an inner one, and the inner router's second provider.
fn nested_selectors() -> (ProviderSelector, Arc<MemoryProvider>) {
    let grandchild =
        Arc::new(MemoryProvider::new("Archive", "memory:archive").with_parent_key("inner"));
    grandchild
        .insert_item("/", "spool.stl", ItemContent::from_static(b"solid spool"))
        .unwrap();

    let inner = ProviderRegistry::builder(
        "inner",
        Arc::new(MemoryProvider::new("Inner root", "memory:inner-root")),
    )
    .add_provider(grandchild.clone())
    .build();
    let outer = ProviderRegistry::builder("outer", database())
        .add_provider(Arc::new(ProviderSelector::new(inner).with_parent_key("outer")))
        .build();
    (ProviderSelector::new(outer), grandchild)
}

/// Items listed two levels down can be removed through the outer router.
#[test]
fn test_nested_item_handles_route_back() {
    let (selector, grandchild) = nested_selectors();
    enter(&selector, printlib::SELECTOR_NAME);
    enter(&selector, "Archive");

    let item = selector.item_at(0).unwrap();
    assert_eq!(item.name, "spool.stl");
    let keys: Vec<&str> = item
        .library_provider_locator()
        .iter()
        .map(|s| s.key.as_str())
        .collect();
    assert_eq!(keys, vec!["outer", "inner", "memory:archive"]);

    selector.remove_item(&item).unwrap();
    assert_eq!(grandchild.item_count(), 0);
    assert_eq!(selector.item_count(), 0);
}

/// Leaving the inner router's root returns the outer router to its root.
#[test]
fn test_nested_root_leads_back_out() {
    let (selector, _) = nested_selectors();
    enter(&selector, printlib::SELECTOR_NAME);
    assert_eq!(selector.selection(), Selection::Selected(1));
    assert_eq!(
        selector.parent_collection(),
        Some(CollectionDescriptor::parent_of("outer"))
    );

    go_up(&selector);
    assert_eq!(selector.selection(), Selection::Unselected);
    assert_eq!(selector.breadcrumbs().len(), 1);
}

// ============================================================================
// Breadcrumbs
// ============================================================================

/// Entering then leaving restores breadcrumbs and selection.
#[test]
fn test_push_then_pop_round_trip() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);
    let initial = selector.breadcrumbs();

    enter(&selector, "Library");
    let inside = selector.breadcrumbs();
    assert_eq!(inside.len(), 2);

    enter(&selector, "Gears");
    assert_eq!(selector.breadcrumbs().len(), 3);
    go_up(&selector);
    assert_eq!(selector.breadcrumbs(), inside);
    assert_eq!(selector.selection(), Selection::Selected(0));

    go_up(&selector);
    assert_eq!(selector.breadcrumbs(), initial);
    assert_eq!(selector.selection(), Selection::Unselected);
}

/// The root breadcrumb survives any amount of upward navigation.
#[test]
fn test_breadcrumb_floor() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);

    for _ in 0..3 {
        enter(&selector, "Downloads");
        go_up(&selector);
        assert_eq!(selector.breadcrumbs().len(), 1);
        assert!(selector.breadcrumbs().top().is_parent_marker());
    }
    assert!(selector.parent_collection().is_none());
}

/// The locator of the current position starts at the selector.
#[test]
fn test_provider_locator_follows_breadcrumbs() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);
    assert!(selector.provider_locator().is_empty());

    enter(&selector, "Library");
    enter(&selector, "Gears");
    let keys: Vec<String> = selector
        .provider_locator()
        .iter()
        .map(|s| s.key.clone())
        .collect();
    assert_eq!(keys, vec![SELECTOR_PROVIDER_KEY, DATABASE_PROVIDER_KEY, "/Gears"]);
}

// ============================================================================
// Items and notifications
// ============================================================================

/// Items found while browsing route back to their owning provider.
#[test]
fn test_item_handles_route_back_to_owner() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);

    enter(&selector, "Downloads");
    let item = selector.item_at(0).unwrap();
    assert_eq!(selector.resolve_provider(item.library_provider_locator()).index, 1);

    selector.remove_item(&item).unwrap();
    assert_eq!(selector.item_count(), 1);
    assert!(!item.file_location.as_ref().unwrap().exists());
}

/// Saving content into the canonical store through the router.
#[test]
fn test_save_item_into_database_collection() {
    let downloads = downloads_tree();
    let registry = ProviderRegistry::builder(SELECTOR_PROVIDER_KEY, database()).build();
    let selector = ProviderSelector::new(registry);

    enter(&selector, "Library");
    enter(&selector, "Gears");
    let target = selector.provider_locator();
    let item = printlib::ItemHandle::new("", "spur.stl", LocatorPath::new())
        .with_file_location(PathBuf::from(downloads.path()).join("cube.stl"));
    selector
        .save_item(&item, ItemContent::from_static(b"solid spur"), Some(&target))
        .unwrap();

    assert_eq!(selector.item_count(), 1);
    assert_eq!(selector.item_at(0).unwrap().name, "spur.stl");
}

/// Every navigation produces exactly one change notification.
#[test]
fn test_navigation_notifies_once_per_move() {
    let downloads = downloads_tree();
    let selector = standard_selector(&downloads);
    let mut rx = selector.subscribe();

    enter(&selector, "Library");
    enter(&selector, "Gears");
    go_up(&selector);

    let mut received = 0;
    while rx.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 3);
}

// ============================================================================
// Properties
// ============================================================================

const REGISTERED: &[&str] = &[DATABASE_PROVIDER_KEY, "memory:a", "memory:b"];

fn property_selector() -> ProviderSelector {
    let registry = ProviderRegistry::builder("sel", Arc::new(MemoryProvider::database("Library")))
        .add_provider(Arc::new(MemoryProvider::new("A", "memory:a")))
        .add_provider(Arc::new(MemoryProvider::new("B", "memory:b")))
        .build();
    ProviderSelector::new(registry)
}

fn segment() -> impl Strategy<Value = LocatorSegment> {
    ("[a-z/]{1,10}", "[A-Za-z ]{0,10}").prop_map(|(k, n)| LocatorSegment::new(k, n))
}

proptest! {
    #[test]
    fn prop_short_paths_fall_back(segments in prop::collection::vec(segment(), 0..2)) {
        let selector = property_selector();
        let route = selector.resolve_provider(&LocatorPath::from(segments));
        prop_assert_eq!(route.index, 0);
        prop_assert!(route.sub_path.is_empty());
    }

    #[test]
    fn prop_matched_key_routes_with_residual(
        head in segment(),
        which in 0..REGISTERED.len(),
        tail in prop::collection::vec(segment(), 0..4),
    ) {
        let selector = property_selector();
        let mut segments = vec![head, LocatorSegment::new(REGISTERED[which], "x")];
        segments.extend(tail);
        let path = LocatorPath::from(segments);

        let route = selector.resolve_provider(&path);
        prop_assert_eq!(route.index, which);
        prop_assert_eq!(route.sub_path, path.without_first());
    }

    #[test]
    fn prop_unmatched_key_falls_back(
        head in segment(),
        key in "[a-z/]{1,10}",
        tail in prop::collection::vec(segment(), 0..4),
    ) {
        // Generated keys are lowercase without a colon, so none is registered.
        let selector = property_selector();
        let mut segments = vec![head, LocatorSegment::new(key, "x")];
        segments.extend(tail);

        let route = selector.resolve_provider(&LocatorPath::from(segments));
        prop_assert_eq!(route.index, 0);
        prop_assert!(route.sub_path.is_empty());
    }
}
