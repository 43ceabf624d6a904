//! Bounded least-recently-used cache of loaded model handles.
//!
//! The cache owns every handle it creates. A handle leaves the cache only
//! through eviction, at which point it is handed back to the loader for
//! release before the evicting call continues.
//!
//! Misses are served by a spawned task that holds the cache lock through
//! evict, load and insert. Dropping the caller's future therefore never
//! strands a loaded model outside the cache.

use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::backends::ModelLoader;
use crate::error::{Error, Result};
use crate::model::ModelKey;

type Entries<H> = LruCache<ModelKey, H>;

/// Borrowed access to a resident model.
///
/// The cache stays locked while this guard is alive, so the handle cannot be
/// evicted while a caller is using it.
pub struct CachedModel<H> {
    key: ModelKey,
    guard: OwnedMappedMutexGuard<Entries<H>, H>,
}

impl<H> CachedModel<H> {
    pub fn key(&self) -> &ModelKey {
        &self.key
    }
}

impl<H> Deref for CachedModel<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.guard
    }
}

pub struct ModelCache<H> {
    name: &'static str,
    capacity: NonZeroUsize,
    loader: Arc<dyn ModelLoader<H>>,
    entries: Arc<Mutex<Entries<H>>>,
}

impl<H: Send + 'static> ModelCache<H> {
    /// Create a cache holding at most `capacity` handles. `name` labels log lines.
    pub fn new(
        name: &'static str,
        capacity: usize,
        loader: Arc<dyn ModelLoader<H>>,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            Error::Config(format!("{name} cache capacity must be at least 1"))
        })?;

        Ok(Self {
            name,
            capacity,
            loader,
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Return the handle for `key`, loading it if it is not resident.
    ///
    /// A miss on a full cache first releases the least recently used handle.
    /// If the load then fails, `key` is not inserted. Once a load has started
    /// it runs to completion even if the returned future is dropped.
    pub async fn acquire(&self, key: &ModelKey) -> Result<CachedModel<H>> {
        let mut entries = self.entries.clone().lock_owned().await;

        if entries.get(key).is_some() {
            debug!("{} model {} already loaded", self.name, key);
        } else {
            info!("{} model {} isn't already loaded", self.name, key);
            let task = tokio::spawn(load_into(
                self.name,
                self.capacity,
                self.loader.clone(),
                entries,
                key.clone(),
            ));
            entries = task.await.map_err(|err| Error::ModelLoad {
                key: key.to_string(),
                message: format!("load task failed: {err}"),
            })??;
        }

        let guard = OwnedMutexGuard::try_map(entries, |entries| entries.peek_mut(key)).map_err(
            |_| Error::ModelLoad {
                key: key.to_string(),
                message: "model is not resident after load".to_string(),
            },
        )?;

        Ok(CachedModel {
            key: key.clone(),
            guard,
        })
    }

    /// Number of resident handles.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Check residency without touching recency.
    pub async fn contains(&self, key: &ModelKey) -> bool {
        self.entries.lock().await.contains(key)
    }

    /// Resident keys, least recently used first.
    pub async fn resident_keys(&self) -> Vec<ModelKey> {
        let entries = self.entries.lock().await;
        entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    /// Unload `key` if resident. Returns whether anything was evicted.
    pub async fn evict(&self, key: &ModelKey) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.pop(key) {
            Some(handle) => {
                info!("Unloading {} model {}", self.name, key);
                release(self.name, self.loader.as_ref(), key, handle).await;
                true
            }
            None => false,
        }
    }

    /// Unload every resident model, least recently used first.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        while let Some((key, handle)) = entries.pop_lru() {
            info!("Unloading {} model {}", self.name, key);
            release(self.name, self.loader.as_ref(), &key, handle).await;
        }
    }
}

/// Evict if full, load `key` and insert it, all under the owned lock. The
/// lock is handed back so the caller can borrow the new handle.
async fn load_into<H: Send + 'static>(
    name: &'static str,
    capacity: NonZeroUsize,
    loader: Arc<dyn ModelLoader<H>>,
    mut entries: OwnedMutexGuard<Entries<H>>,
    key: ModelKey,
) -> Result<OwnedMutexGuard<Entries<H>>> {
    if entries.len() >= capacity.get() {
        if let Some((evicted, handle)) = entries.pop_lru() {
            info!("Unloading least recently used {} model {}", name, evicted);
            release(name, loader.as_ref(), &evicted, handle).await;
        }
    }

    let started = Instant::now();
    let handle = loader.load(&key).await.map_err(|err| match err {
        Error::ModelLoad { .. } => err,
        other => Error::ModelLoad {
            key: key.to_string(),
            message: other.to_string(),
        },
    })?;
    info!(
        "Loaded {} model {} in {:.2} seconds",
        name,
        key,
        started.elapsed().as_secs_f64()
    );

    if let Some((displaced, handle)) = entries.push(key, handle) {
        // Capacity was enforced above, so `push` never displaces anything.
        warn!("{} cache displaced {} unexpectedly", name, displaced);
        release(name, loader.as_ref(), &displaced, handle).await;
    }
    Ok(entries)
}

async fn release<H>(name: &str, loader: &dyn ModelLoader<H>, key: &ModelKey, handle: H) {
    if let Err(err) = loader.release(key, handle).await {
        warn!("Failed to release {} model {}: {}", name, key, err);
    }
}
