//! Bounded cache of open decoder handles.
//!
//! The cache provides:
//! - LRU eviction with a fixed entry budget
//! - Singleflight opens: concurrent misses on one key open the file once
//! - Uncached handles for styled requests
//!
//! # Locking
//!
//! The key index (LRU map plus in-flight opens) sits behind one async mutex that
//! is only held for map bookkeeping. Backend opens run on the blocking pool with
//! the index unlocked, and reads only ever take the per-source lock inside
//! [`ImageSource`], so resources never wait on each other.
//!
//! Evicting an entry drops the cache's `Arc`. The handle is closed when the last
//! clone goes away, so readers that already hold the source finish first.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use super::image::ImageSource;
use crate::decoder::{DecoderRegistry, OpenOptions};
use crate::error::TileError;
use crate::tile::TileAssembler;

/// Default number of cached handles.
pub const DEFAULT_HANDLE_CACHE_CAPACITY: usize = 10;

// =============================================================================
// Entries
// =============================================================================

struct CacheEntry {
    source: Arc<ImageSource>,
    last_access: Instant,
}

type OpenResult = Result<Arc<ImageSource>, TileError>;

/// Entries are keyed by resolved path; styled sources are never indexed.
struct CacheIndex {
    entries: LruCache<PathBuf, CacheEntry>,
    /// Opens in progress, one cell per path
    pending: HashMap<PathBuf, Arc<OnceCell<OpenResult>>>,
}

/// Snapshot of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub capacity: usize,
    /// Cached paths, most recently used first
    pub keys: Vec<String>,
}

// =============================================================================
// DecoderHandleCache
// =============================================================================

pub struct DecoderHandleCache {
    registry: Arc<DecoderRegistry>,
    assembler: TileAssembler,
    capacity: NonZeroUsize,
    index: Mutex<CacheIndex>,
}

impl DecoderHandleCache {
    /// Create a cache holding at most `capacity` handles (at least 1).
    pub fn new(registry: Arc<DecoderRegistry>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            registry,
            assembler: TileAssembler::default(),
            capacity,
            index: Mutex::new(CacheIndex {
                entries: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
        }
    }

    /// Use `assembler` for the open-time read check and for tiles served from this cache.
    pub fn with_assembler(mut self, assembler: TileAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn assembler(&self) -> TileAssembler {
        self.assembler
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Get an open source for `path`, opening it on a miss.
    ///
    /// A hit marks the entry most recently used. With a `style`, a fresh
    /// uncached source is opened and closed once the caller drops it.
    pub async fn acquire(
        &self,
        path: &Path,
        style: Option<&serde_json::Value>,
    ) -> Result<Arc<ImageSource>, TileError> {
        if let Some(style) = style {
            debug!(path = %path.display(), "Opening uncached handle for styled request");
            let options = OpenOptions::styled(style.clone());
            return self.open(path.to_path_buf(), options).await.map(Arc::new);
        }

        let cell = {
            let mut index = self.index.lock().await;
            if let Some(entry) = index.entries.get_mut(path) {
                entry.last_access = Instant::now();
                return Ok(Arc::clone(&entry.source));
            }
            Arc::clone(index.pending.entry(path.to_path_buf()).or_default())
        };

        cell.get_or_init(|| self.open_and_insert(path.to_path_buf()))
            .await
            .clone()
    }

    /// Open a source and publish it, called by exactly one waiter per pending cell.
    async fn open_and_insert(&self, path: PathBuf) -> OpenResult {
        let result = self
            .open(path.clone(), OpenOptions::default())
            .await
            .map(Arc::new);

        let evicted = {
            let mut index = self.index.lock().await;
            index.pending.remove(&path);
            match &result {
                Ok(source) => index.entries.push(
                    path.clone(),
                    CacheEntry {
                        source: Arc::clone(source),
                        last_access: Instant::now(),
                    },
                ),
                Err(_) => None,
            }
        };

        match &result {
            Ok(_) => info!(path = %path.display(), "Opened image"),
            Err(e) => debug!(path = %path.display(), error = %e, "Open failed, not caching"),
        }
        if let Some((evicted_path, entry)) = evicted {
            debug!(
                path = %evicted_path.display(),
                idle_ms = entry.last_access.elapsed().as_millis() as u64,
                "Evicted least recently used handle"
            );
        }

        result
    }

    async fn open(&self, path: PathBuf, options: OpenOptions) -> Result<ImageSource, TileError> {
        let registry = Arc::clone(&self.registry);
        let assembler = self.assembler;
        tokio::task::spawn_blocking(move || {
            ImageSource::open(&path, &registry, &options, &assembler)
        })
        .await
        .map_err(|e| TileError::Internal {
            message: format!("open task failed: {e}"),
        })?
    }

    /// Remove the entry for `path`. Returns whether one was cached.
    pub async fn evict(&self, path: &Path) -> bool {
        let removed = {
            let mut index = self.index.lock().await;
            index.entries.pop(path)
        };
        if removed.is_some() {
            debug!(path = %path.display(), "Evicted handle");
        }
        removed.is_some()
    }

    /// Remove `source` if it is still the cached entry for its path.
    ///
    /// Used when a backend reports a handle unusable; a newer handle opened in
    /// the meantime is left alone.
    pub async fn invalidate(&self, source: &Arc<ImageSource>) -> bool {
        let path = source.path();
        let removed = {
            let mut index = self.index.lock().await;
            let is_current = index
                .entries
                .peek(path)
                .is_some_and(|entry| Arc::ptr_eq(&entry.source, source));
            if is_current {
                index.entries.pop(path)
            } else {
                None
            }
        };
        removed.is_some()
    }

    /// Drop every cached handle. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let drained = {
            let mut index = self.index.lock().await;
            std::mem::replace(&mut index.entries, LruCache::new(self.capacity))
        };
        let count = drained.len();
        drop(drained);
        if count > 0 {
            info!(count, "Cleared handle cache");
        }
        count
    }

    pub async fn stats(&self) -> CacheStats {
        let index = self.index.lock().await;
        CacheStats {
            count: index.entries.len(),
            capacity: self.capacity.get(),
            keys: index
                .entries
                .iter()
                .map(|(path, _)| path.display().to_string())
                .collect(),
        }
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, path: &Path) -> bool {
        let index = self.index.lock().await;
        index.entries.contains(path)
    }
}

// =============================================================================
// Tests
// =============================================================================
