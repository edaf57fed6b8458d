//! Error types for library providers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors that can occur while navigating or mutating the library.
///
/// The composite router never rewrites an error coming from a backend; the
/// backend's error is the caller's error.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The operation has no meaning at the router's own root.
    #[error("{operation} is not supported at the provider root")]
    Unsupported { operation: &'static str },

    /// Provider 0 is not the canonical database-backed store.
    #[error("provider 0 must be the canonical store '{expected}', found '{found}'")]
    NonCanonicalRoot { expected: String, found: String },

    /// A collection key matched no provider and none is selected to delegate to.
    #[error("no provider matches '{key}' and no provider is selected")]
    NoActiveProvider { key: String },

    /// Positional access outside `[0, count)`.
    #[error("index {index} out of range (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// The provider has no collection with this key.
    #[error("collection not found: {key}")]
    CollectionNotFound { key: String },

    /// The provider has no item with this id.
    #[error("item not found: {id}")]
    ItemNotFound { id: String },

    /// A collection or item name is not acceptable to the backend.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A path escapes the provider's root.
    #[error("path is outside the provider root: {}", .path.display())]
    OutsideRoot { path: PathBuf },

    /// Filesystem failure in a backend.
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl LibraryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error signals a misconstructed registry rather than a
    /// recoverable failure.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::NonCanonicalRoot { .. } | Self::NoActiveProvider { .. }
        )
    }
}
