//! Plugin-supplied providers.
//!
//! Plugin discovery itself is outside this crate: a [`PluginDiscovery`]
//! implementation returns factories, and each factory produces a provider
//! bound to the composite that will host it.

use std::sync::Arc;

use super::LibraryProvider;

/// Factory for a plugin-supplied provider.
pub trait ProviderPlugin: Send + Sync {
    /// Human readable plugin name, used for logging.
    fn plugin_name(&self) -> &str;

    /// Create the provider. `parent_key` is the hosting composite's key.
    fn create_provider(&self, parent_key: &str) -> Arc<dyn LibraryProvider>;
}

/// Source of provider plugins, queried once while building a registry.
pub trait PluginDiscovery {
    fn discover(&self) -> Vec<Arc<dyn ProviderPlugin>>;
}

/// Discovery over a fixed list of plugins.
#[derive(Default, Clone)]
pub struct StaticPluginDiscovery {
    plugins: Vec<Arc<dyn ProviderPlugin>>,
}

impl StaticPluginDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn ProviderPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }
}

impl PluginDiscovery for StaticPluginDiscovery {
    fn discover(&self) -> Vec<Arc<dyn ProviderPlugin>> {
        self.plugins.clone()
    }
}
