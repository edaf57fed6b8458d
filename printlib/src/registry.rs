//! Provider registry.
//!
//! The ordered list of providers a composite aggregates. Construction order
//! is the index order used by every positional dispatch and is load-bearing:
//!
//! 1. The canonical database-backed store (always index 0)
//! 2. Directory-tree stores, in configuration order
//! 3. Plugin-supplied stores, in discovery order
//!
//! The registry is immutable once built. Providers may change their own
//! content, but membership never changes at runtime, so a registry can be
//! shared for reads across navigation sessions.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use printlib::registry::ProviderRegistry;
//! use printlib::store::MemoryProvider;
//!
//! let database = Arc::new(MemoryProvider::database("Library"));
//! let registry = ProviderRegistry::builder("ProviderSelectorKey", database)
//!     .add_provider(Arc::new(MemoryProvider::new("Scratch", "memory:scratch")))
//!     .build();
//!
//! assert_eq!(registry.len(), 2);
//! assert_eq!(registry.position("memory:scratch"), Some(1));
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::DirectoryRootConfig;
use crate::error::{LibraryError, LibraryResult};
use crate::provider::{LibraryProvider, PluginDiscovery, DATABASE_PROVIDER_KEY};
use crate::store::DirectoryProvider;

/// Ordered, immutable list of providers hosted by one composite.
#[derive(Clone)]
pub struct ProviderRegistry {
    host_key: String,
    providers: Vec<Arc<dyn LibraryProvider>>,
}

impl ProviderRegistry {
    /// Start a registry for the composite `host_key`, with `database` as
    /// provider 0.
    pub fn builder(
        host_key: impl Into<String>,
        database: Arc<dyn LibraryProvider>,
    ) -> ProviderRegistryBuilder {
        ProviderRegistryBuilder {
            host_key: host_key.into(),
            providers: vec![database],
        }
    }

    /// Key of the composite hosting these providers.
    pub fn host_key(&self) -> &str {
        &self.host_key
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Never true: provider 0 is mandatory.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn LibraryProvider>> {
        self.providers.get(index)
    }

    /// Index of the provider whose key is `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.provider_key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LibraryProvider>> {
        self.providers.iter()
    }

    /// Provider 0, checked to be the canonical database-backed store.
    pub fn canonical(&self) -> LibraryResult<&Arc<dyn LibraryProvider>> {
        let first = &self.providers[0];
        if first.provider_key() != DATABASE_PROVIDER_KEY {
            return Err(LibraryError::NonCanonicalRoot {
                expected: DATABASE_PROVIDER_KEY.to_string(),
                found: first.provider_key().to_string(),
            });
        }
        Ok(first)
    }
}

impl std::ops::Index<usize> for ProviderRegistry {
    type Output = Arc<dyn LibraryProvider>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.providers[index]
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("host_key", &self.host_key)
            .field(
                "providers",
                &self.providers.iter().map(|p| p.provider_key()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder preserving construction order.
pub struct ProviderRegistryBuilder {
    host_key: String,
    providers: Vec<Arc<dyn LibraryProvider>>,
}

impl ProviderRegistryBuilder {
    /// Append a provider.
    pub fn add_provider(mut self, provider: Arc<dyn LibraryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Append one directory provider per configured root.
    ///
    /// Roots that cannot be opened are skipped with a warning so that one
    /// unplugged drive does not take the whole library down.
    pub fn add_directories(mut self, roots: &[DirectoryRootConfig]) -> Self {
        for root in roots {
            match self.open_directory(root) {
                Ok(provider) => self.providers.push(Arc::new(provider)),
                Err(e) => {
                    warn!(name = %root.name, path = %root.path.display(), error = %e, "Skipping directory provider")
                }
            }
        }
        self
    }

    /// Query `discovery` once and append every plugin's provider.
    ///
    /// Each factory receives this registry's host key as parent context.
    pub fn discover_plugins(mut self, discovery: &dyn PluginDiscovery) -> Self {
        for plugin in discovery.discover() {
            let provider = plugin.create_provider(&self.host_key);
            info!(
                plugin = plugin.plugin_name(),
                provider = provider.provider_key(),
                "Plugin provider registered"
            );
            self.providers.push(provider);
        }
        self
    }

    pub fn build(self) -> ProviderRegistry {
        let first = self.providers[0].provider_key();
        if first != DATABASE_PROVIDER_KEY {
            warn!(
                provider = first,
                expected = DATABASE_PROVIDER_KEY,
                "Provider 0 is not the canonical database store"
            );
        }
        for (i, provider) in self.providers.iter().enumerate() {
            if self.providers[..i]
                .iter()
                .any(|p| p.provider_key() == provider.provider_key())
            {
                warn!(provider = provider.provider_key(), index = i, "Duplicate provider key");
            }
        }
        info!(host = %self.host_key, providers = self.providers.len(), "Provider registry built");

        ProviderRegistry {
            host_key: self.host_key,
            providers: self.providers,
        }
    }

    fn open_directory(&self, root: &DirectoryRootConfig) -> LibraryResult<DirectoryProvider> {
        let provider = DirectoryProvider::new(&root.path, root.name.clone())?
            .with_parent_key(self.host_key.clone());
        match &root.extensions {
            Some(extensions) => provider.with_extensions(extensions.iter().cloned()),
            None => Ok(provider),
        }
    }
}
