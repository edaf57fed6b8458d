//! Collection descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locator::LocatorSegment;

/// Display name used for "up one level" descriptors.
pub const PARENT_COLLECTION_NAME: &str = "..";

/// A named, keyed handle to a collection (folder equivalent).
///
/// Descriptors are independent of the provider that owns the collection.
/// When a descriptor represents "enter this provider", its key is the
/// provider's key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    pub key: String,
}

impl CollectionDescriptor {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    /// The synthetic "up one level" descriptor pointing at `key`.
    pub fn parent_of(key: impl Into<String>) -> Self {
        Self::new(PARENT_COLLECTION_NAME, key)
    }

    /// Whether this is a synthetic "up one level" descriptor.
    pub fn is_parent_marker(&self) -> bool {
        self.name == PARENT_COLLECTION_NAME
    }

    /// Locator segment for this descriptor.
    pub fn to_segment(&self) -> LocatorSegment {
        LocatorSegment::new(self.key.clone(), self.name.clone())
    }
}

impl From<&LocatorSegment> for CollectionDescriptor {
    fn from(segment: &LocatorSegment) -> Self {
        Self::new(segment.display_name.clone(), segment.key.clone())
    }
}

impl fmt::Display for CollectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.key)
    }
}
