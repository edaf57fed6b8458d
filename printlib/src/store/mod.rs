//! Reference provider implementations.
//!
//! - [`MemoryProvider`]: in-memory tree, used as the canonical store in tests
//! - [`DirectoryProvider`]: a filesystem directory presented as a library

mod directory;
mod memory;

pub use directory::{DirectoryProvider, DEFAULT_ITEM_EXTENSIONS, DIRECTORY_KEY_PREFIX};
pub use memory::{MemoryProvider, MEMORY_ROOT_KEY};
