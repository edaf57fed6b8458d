//! Library item handles and bulk import plumbing.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::locator::LocatorPath;

/// Opaque item content (mesh or print file bytes).
pub type ItemContent = bytes::Bytes;

/// Reference to a single library item.
///
/// A handle is owned by exactly one backend. The locator it carries is a
/// back-reference used for routing only; the router never reads or owns the
/// item's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHandle {
    /// Identifier, unique within the owning provider.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Backing file, when the item lives on disk.
    pub file_location: Option<PathBuf>,
    locator: LocatorPath,
}

impl ItemHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>, locator: LocatorPath) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_location: None,
            locator,
        }
    }

    /// Set the backing file location.
    pub fn with_file_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_location = Some(path.into());
        self
    }

    /// Replace the owning locator.
    ///
    /// Composites use this to re-address a handle as it crosses one of
    /// their boundaries.
    pub fn with_locator(mut self, locator: LocatorPath) -> Self {
        self.locator = locator;
        self
    }

    /// Locator of the collection that owns this item.
    pub fn library_provider_locator(&self) -> &LocatorPath {
        &self.locator
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Progress report for a bulk import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportProgress {
    /// Files processed so far.
    pub completed: usize,
    /// Files in the batch.
    pub total: usize,
    /// File currently being processed.
    pub current: Option<PathBuf>,
}

impl ImportProgress {
    /// Progress as a fraction from 0.0 to 1.0.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// Result of a bulk import, handed to the completion callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    /// Number of files added.
    pub imported: usize,
    /// Files that could not be added, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl ImportOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Invoked by the importing backend, on whatever thread it chooses.
pub type ProgressCallback = Arc<dyn Fn(&ImportProgress) + Send + Sync>;

/// Invoked once by the importing backend when the batch is done.
pub type CompletionCallback = Box<dyn FnOnce(&ImportOutcome) + Send>;

/// Optional callbacks for [`add_items`](crate::provider::LibraryProvider::add_items).
#[derive(Default)]
pub struct ImportCallbacks {
    pub progress: Option<ProgressCallback>,
    pub completion: Option<CompletionCallback>,
}

impl ImportCallbacks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_completion(mut self, completion: CompletionCallback) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Report progress if a progress callback was supplied.
    pub fn report(&self, progress: &ImportProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    /// Consume the completion callback, if any.
    pub fn complete(self, outcome: &ImportOutcome) {
        if let Some(callback) = self.completion {
            callback(outcome);
        }
    }
}

impl fmt::Debug for ImportCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportCallbacks")
            .field("progress", &self.progress.is_some())
            .field("completion", &self.completion.is_some())
            .finish()
    }
}
