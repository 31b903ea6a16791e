
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::Config;
use crate::database::collection::{
    ScopeKey, StorageLayout, VectorCollection, collection_exists,
};

/// Shared handle to an open collection. Writers inside one process are
/// serialized by the lock; other processes are not coordinated.
pub type CollectionHandle = Arc<RwLock<VectorCollection>>;

/// Process-wide cache of open collections, loaded lazily per scope
#[derive(Debug)]
pub struct CollectionRegistry {
    layout: StorageLayout,
    dimension: usize,
    handles: Mutex<HashMap<ScopeKey, CollectionHandle>>,
}

impl CollectionRegistry {
    #[inline]
    pub fn new(layout: StorageLayout, dimension: usize) -> Self {
        Self {
            layout,
            dimension,
            handles: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            StorageLayout::from_config(config),
            config.ollama.embedding_dimension as usize,
        )
    }

    #[inline]
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The global collection, created on first use
    #[inline]
    pub async fn global(&self) -> Result<CollectionHandle> {
        self.open_or_create(ScopeKey::Global).await
    }

    #[inline]
    pub async fn open_or_create(&self, scope: ScopeKey) -> Result<CollectionHandle> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(&scope) {
            if collection_exists(&self.layout, &scope) {
                return Ok(Arc::clone(handle));
            }
            debug!("Backing files for {} disappeared, reopening", scope);
            handles.remove(&scope);
        }

        let layout = self.layout.clone();
        let dimension = self.dimension;
        let opened = scope.clone();
        let collection = tokio::task::spawn_blocking(move || {
            VectorCollection::open_or_create(&layout, opened, dimension)
        })
        .await
        .context("Collection open task panicked")??;
        let handle = Arc::new(RwLock::new(collection));
        handles.insert(scope, Arc::clone(&handle));
        Ok(handle)
    }

    /// Open an already persisted collection without creating one
    #[inline]
    pub async fn open_existing(&self, scope: &ScopeKey) -> Result<CollectionHandle> {
        let mut handles = self.handles.lock().await;
        let exists = collection_exists(&self.layout, scope);

        if let Some(handle) = handles.get(scope) {
            if exists {
                return Ok(Arc::clone(handle));
            }
            handles.remove(scope);
        }

        let layout = self.layout.clone();
        let dimension = self.dimension;
        let opened = scope.clone();
        let collection = tokio::task::spawn_blocking(move || {
            VectorCollection::open_existing(&layout, opened, dimension)
        })
        .await
        .context("Collection open task panicked")??;
        let handle = Arc::new(RwLock::new(collection));
        handles.insert(scope.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Resolve scopes to open collections, in the order given.
    ///
    /// With no scopes this is the global collection. Otherwise scopes whose
    /// files are missing or unreadable are logged and left out.
    #[inline]
    pub async fn resolve(&self, scopes: &[ScopeKey]) -> Result<Vec<(ScopeKey, CollectionHandle)>> {
        if scopes.is_empty() {
            return Ok(vec![(ScopeKey::Global, self.global().await?)]);
        }

        let mut resolved = Vec::with_capacity(scopes.len());
        for scope in scopes {
            match self.open_existing(scope).await {
                Ok(handle) => resolved.push((scope.clone(), handle)),
                Err(e) => warn!("Skipping scope {}: {:#}", scope, e),
            }
        }

        debug!("Resolved {}/{} scopes", resolved.len(), scopes.len());
        Ok(resolved)
    }

    /// Drop the cached handle for `scope`
    #[inline]
    pub async fn evict(&self, scope: &ScopeKey) {
        self.handles.lock().await.remove(scope);
    }

    /// Drop the cached handle and delete the backing files
    #[inline]
    pub async fn destroy(&self, scope: &ScopeKey) -> Result<()> {
        let mut handles = self.handles.lock().await;
        handles.remove(scope);
        let layout = self.layout.clone();
        let scope = scope.clone();
        tokio::task::spawn_blocking(move || VectorCollection::destroy(&layout, &scope))
            .await
            .context("Collection destroy task panicked")?
    }
}
