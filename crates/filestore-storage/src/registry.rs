//! Adapter registry: resolves adapter names to live storage backends.
//!
//! Backends are built lazily on first resolution and cached per name, because
//! building one may involve connection setup. The registry is an explicit value
//! handed to whoever needs it; clones share the same cache.

use crate::factory::create_storage;
use crate::{Storage, StorageBackend, StorageResult};
use filestore_core::{AdapterSettings, Config, FileStorageError, FileStorageResult};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Builds a backend for adapters that are not described by [`AdapterSettings`].
pub type StorageFactory = Arc<dyn Fn() -> StorageResult<Arc<dyn Storage>> + Send + Sync>;

#[derive(Clone)]
enum AdapterSource {
    Settings(AdapterSettings),
    Factory(StorageFactory),
}

/// A resolved adapter: its registered name plus the live backend.
#[derive(Clone)]
pub struct AdapterHandle {
    name: String,
    storage: Arc<dyn Storage>,
}

impl AdapterHandle {
    pub fn new(name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Whether both handles point at the same backend instance.
    pub fn same_instance(&self, other: &AdapterHandle) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }
}

impl Deref for AdapterHandle {
    type Target = dyn Storage;

    fn deref(&self) -> &Self::Target {
        self.storage.as_ref()
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("name", &self.name)
            .field("backend", &self.storage.backend_type())
            .finish()
    }
}

/// Registry of named storage adapters.
///
/// Thread-safe: the instance cache sits behind a mutex, so concurrent
/// resolutions of one name construct the backend only once.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    sources: Arc<RwLock<HashMap<String, AdapterSource>>>,
    instances: Arc<Mutex<HashMap<String, AdapterHandle>>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every adapter listed in the configuration.
    pub fn from_config(config: &Config) -> Self {
        let sources = config
            .adapters
            .iter()
            .map(|(name, settings)| (name.clone(), AdapterSource::Settings(settings.clone())))
            .collect();

        Self {
            sources: Arc::new(RwLock::new(sources)),
            instances: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register (or replace) the settings for an adapter name.
    ///
    /// A cached backend for that name is dropped so the next resolution uses
    /// the new settings.
    pub async fn register(&self, name: impl Into<String>, settings: AdapterSettings) {
        self.add_source(name.into(), AdapterSource::Settings(settings))
            .await;
    }

    /// Register an adapter built by a custom factory.
    pub async fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> StorageResult<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        self.add_source(name.into(), AdapterSource::Factory(Arc::new(factory)))
            .await;
    }

    /// Register an already constructed backend under a name.
    pub async fn insert(&self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        self.register_factory(name, move || Ok(storage.clone()))
            .await;
    }

    async fn add_source(&self, name: String, source: AdapterSource) {
        self.sources.write().await.insert(name.clone(), source);
        self.evict(&name).await;
    }

    /// Check if an adapter name has a registered configuration
    pub async fn is_configured(&self, name: &str) -> bool {
        self.sources.read().await.contains_key(name)
    }

    /// Names of all configured adapters, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop the cached backend for a name. Returns whether one was cached.
    pub async fn evict(&self, name: &str) -> bool {
        self.instances.lock().await.remove(name).is_some()
    }

    /// Resolve an adapter name to a live backend.
    ///
    /// Returns the cached handle for `name` unless `force_new` is set, in which
    /// case the cached handle is discarded and a fresh backend constructed.
    pub async fn resolve(&self, name: &str, force_new: bool) -> FileStorageResult<AdapterHandle> {
        let mut instances = self.instances.lock().await;

        if force_new {
            if instances.remove(name).is_some() {
                tracing::debug!(adapter = %name, "Discarded cached storage adapter");
            }
        } else if let Some(handle) = instances.get(name) {
            return Ok(handle.clone());
        }

        let source = self
            .sources
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| FileStorageError::AdapterNotConfigured(name.to_string()))?;

        let storage = match source {
            AdapterSource::Settings(settings) => create_storage(&settings).await?,
            AdapterSource::Factory(factory) => factory()?,
        };

        let handle = AdapterHandle::new(name, storage);
        instances.insert(name.to_string(), handle.clone());

        tracing::info!(
            adapter = %name,
            backend = %handle.backend_type(),
            "Storage adapter constructed"
        );

        Ok(handle)
    }

    /// Backend type of a configured adapter, without constructing it.
    pub async fn backend_of(&self, name: &str) -> Option<StorageBackend> {
        let source = self.sources.read().await.get(name).cloned()?;
        match source {
            AdapterSource::Settings(settings) => Some(settings.backend()),
            AdapterSource::Factory(_) => self
                .instances
                .lock()
                .await
                .get(name)
                .map(|handle| handle.backend_type()),
        }
    }
}
