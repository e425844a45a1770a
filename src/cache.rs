//! Path cache with wholesale invalidation.
//!
//! ## Purpose
//!
//! Avoids recomputing identical path and distance queries while the graph
//! shape is unchanged. The cache also holds the built [`GraphIndex`] and the
//! last [`ConnectivityReport`], so a single invalidation drops everything
//! derived from the old graph.
//!
//! ## Key Design
//!
//! The graph is undirected, so `(A, B)` and `(B, A)` share one slot. Paths
//! are stored oriented from the lower id to the higher id and flipped on
//! the way out to match the caller's requested direction.
//!
//! ## Eviction
//!
//! Bounded, first-in first-out. Reads use a non-promoting peek, so the
//! entry evicted at capacity is always the oldest inserted one.
//!
//! ## Invalidation
//!
//! Any topic create, update, soft-delete or restore clears the cache in its
//! entirety. There is no per-path dependency tracking. A generation counter
//! is bumped on every invalidation; results computed against an older
//! generation are discarded instead of inserted.

use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::connectivity::ConnectivityReport;
use crate::index::GraphIndex;
use crate::types::{TopicId, TopicMutation};

/// Configuration for the path cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of path entries in the cache.
    pub max_entries: usize,
    /// Whether to enable the cache.
    ///
    /// When disabled every query rebuilds the index from the store.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            enabled: true,
        }
    }
}

/// Receives notifications of graph-affecting topic writes.
///
/// Stores call this after every committed create, update, soft-delete or
/// restore.
pub trait TopicMutationListener: Send + Sync {
    /// Handle a committed mutation.
    fn on_topic_mutation(&self, mutation: &TopicMutation);
}

/// Cache key for path queries: an unordered pair of topic ids.
///
/// Always stored as `(low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey {
    low: TopicId,
    high: TopicId,
}

impl PathKey {
    /// Normalize a pair of endpoints.
    pub fn new(a: TopicId, b: TopicId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Lower endpoint.
    pub fn low(&self) -> TopicId {
        self.low
    }

    /// Higher endpoint.
    pub fn high(&self) -> TopicId {
        self.high
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Current number of path entries.
    pub size: usize,
    /// Maximum number of path entries (0 when disabled).
    pub capacity: usize,
    /// Whether a built index is currently held.
    pub index_valid: bool,
    /// Path lookups served from the cache.
    pub hits: u64,
    /// Path lookups that had to be computed.
    pub misses: u64,
    /// Number of wholesale invalidations so far.
    pub invalidations: u64,
}

/// Bounded FIFO cache of path results plus the index they were computed on.
///
/// Thread-safe; intended to be shared through an `Arc` between the engine
/// and whatever publishes topic mutations.
///
/// # Example
///
/// ```rust,ignore
/// use topic_graph_kernel::cache::{CacheConfig, PathCache};
///
/// let cache = Arc::new(PathCache::new(CacheConfig::default()));
/// store.subscribe(cache.clone());
/// let engine = TopicGraphEngine::new(store, cache);
/// ```
pub struct PathCache {
    config: CacheConfig,
    paths: Option<RwLock<LruCache<PathKey, Arc<[TopicId]>>>>,
    index: RwLock<Option<Arc<GraphIndex>>>,
    connectivity: RwLock<Option<Arc<ConnectivityReport>>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl PathCache {
    /// Create a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let paths = match NonZeroUsize::new(config.max_entries) {
            Some(size) if config.enabled => Some(RwLock::new(LruCache::new(size))),
            _ => None,
        };

        Self {
            config,
            paths,
            index: RwLock::new(None),
            connectivity: RwLock::new(None),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Create a cache that never holds anything.
    pub fn disabled() -> Self {
        Self::new(CacheConfig {
            max_entries: 0,
            enabled: false,
        })
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn is_enabled(&self) -> bool {
        self.paths.is_some()
    }

    /// Current generation. Bumped by every invalidation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Look up a cached path, oriented from `start` to `end`.
    pub fn get_path(&self, start: TopicId, end: TopicId) -> Option<Vec<TopicId>> {
        let paths = self.paths.as_ref()?;
        let key = PathKey::new(start, end);

        let cached = paths.read().peek(&key).cloned();
        match cached {
            Some(path) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(target: "topic_graph::cache", %start, %end, "path cache hit");
                Some(orient(&path, key, start))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a path computed against `generation`.
    ///
    /// `path` is oriented from `start` to `end` (or empty). Returns `false`
    /// if the cache is disabled or was invalidated since `generation`.
    pub fn insert_path(&self, start: TopicId, end: TopicId, path: &[TopicId], generation: u64) -> bool {
        let Some(paths) = self.paths.as_ref() else {
            return false;
        };
        let key = PathKey::new(start, end);
        let canonical: Arc<[TopicId]> = orient(path, key, start).into();

        let mut paths = paths.write();
        if self.generation() != generation {
            return false;
        }
        paths.put(key, canonical);
        true
    }

    /// The cached index, if still valid.
    pub fn index(&self) -> Option<Arc<GraphIndex>> {
        self.index.read().clone()
    }

    /// Install an index built against `generation`.
    pub fn install_index(&self, index: Arc<GraphIndex>, generation: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut slot = self.index.write();
        if self.generation() != generation {
            return false;
        }
        *slot = Some(index);
        true
    }

    /// The cached connectivity report, if still valid.
    pub fn connectivity(&self) -> Option<Arc<ConnectivityReport>> {
        self.connectivity.read().clone()
    }

    /// Install a connectivity report computed against `generation`.
    pub fn install_connectivity(&self, report: Arc<ConnectivityReport>, generation: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut slot = self.connectivity.write();
        if self.generation() != generation {
            return false;
        }
        *slot = Some(report);
        true
    }

    /// Drop every entry, the index and the connectivity report.
    pub fn invalidate(&self) {
        // Locks are taken in a fixed order; inserters take one lock each.
        let mut paths = self.paths.as_ref().map(|p| p.write());
        let mut index = self.index.write();
        let mut connectivity = self.connectivity.write();

        let dropped = paths.as_ref().map_or(0, |p| p.len());
        if let Some(paths) = paths.as_mut() {
            paths.clear();
        }
        *index = None;
        *connectivity = None;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.invalidations.fetch_add(1, Ordering::Relaxed);

        info!(
            target: "topic_graph::cache",
            dropped_paths = dropped,
            generation = generation,
            "path cache invalidated"
        );
    }

    /// Clear the cache on operator request.
    pub fn clear(&self) {
        self.invalidate();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (size, capacity) = self
            .paths
            .as_ref()
            .map(|p| {
                let p = p.read();
                (p.len(), p.cap().get())
            })
            .unwrap_or((0, 0));

        CacheStats {
            size,
            capacity,
            index_valid: self.index.read().is_some(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .field("stats", &self.stats())
            .finish()
    }
}

impl TopicMutationListener for PathCache {
    fn on_topic_mutation(&self, mutation: &TopicMutation) {
        debug!(target: "topic_graph::cache", %mutation, "topic mutation observed");
        self.invalidate();
    }
}

/// Flip a path between stored (low -> high) and requested orientation.
///
/// `from` is the endpoint the caller treats as the start.
fn orient(path: &[TopicId], key: PathKey, from: TopicId) -> Vec<TopicId> {
    let mut out = path.to_vec();
    if from != key.low {
        out.reverse();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Topic;
    use uuid::Uuid;

    fn id(n: u128) -> TopicId {
        TopicId::new(Uuid::from_u128(n))
    }

    #[test]
    fn test_key_is_unordered() {
        assert_eq!(PathKey::new(id(1), id(2)), PathKey::new(id(2), id(1)));
        assert_eq!(PathKey::new(id(2), id(1)).low(), id(1));
        assert_eq!(PathKey::new(id(2), id(1)).high(), id(2));
    }

    #[test]
    fn test_reverse_query_served_in_caller_order() {
        let cache = PathCache::default();
        let generation = cache.generation();

        assert!(cache.insert_path(id(1), id(3), &[id(1), id(2), id(3)], generation));

        assert_eq!(cache.get_path(id(1), id(3)), Some(vec![id(1), id(2), id(3)]));
        assert_eq!(cache.get_path(id(3), id(1)), Some(vec![id(3), id(2), id(1)]));
    }

    #[test]
    fn test_insert_from_high_endpoint() {
        let cache = PathCache::default();
        let generation = cache.generation();

        cache.insert_path(id(3), id(1), &[id(3), id(2), id(1)], generation);
        assert_eq!(cache.get_path(id(1), id(3)), Some(vec![id(1), id(2), id(3)]));
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_empty_path_cached() {
        let cache = PathCache::default();
        cache.insert_path(id(1), id(4), &[], cache.generation());
        assert_eq!(cache.get_path(id(4), id(1)), Some(vec![]));
    }

    #[test]
    fn test_miss_and_hit_counters() {
        let cache = PathCache::default();
        assert!(cache.get_path(id(1), id(2)).is_none());
        cache.insert_path(id(1), id(2), &[id(1), id(2)], cache.generation());
        assert!(cache.get_path(id(1), id(2)).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_fifo_eviction_ignores_reads() {
        let cache = PathCache::new(CacheConfig {
            max_entries: 2,
            enabled: true,
        });
        let generation = cache.generation();

        cache.insert_path(id(1), id(2), &[id(1), id(2)], generation);
        cache.insert_path(id(2), id(3), &[id(2), id(3)], generation);

        // Reading the oldest entry must not protect it
        assert!(cache.get_path(id(1), id(2)).is_some());

        cache.insert_path(id(3), id(4), &[id(3), id(4)], generation);

        assert!(cache.get_path(id(1), id(2)).is_none());
        assert!(cache.get_path(id(2), id(3)).is_some());
        assert!(cache.get_path(id(3), id(4)).is_some());
        assert_eq!(cache.stats().size, 2);
        assert_eq!(cache.stats().capacity, 2);
    }

    #[test]
    fn test_invalidate_clears_everything() {
        let cache = PathCache::default();
        let generation = cache.generation();
        let index = Arc::new(GraphIndex::build(vec![Topic::new(id(1), "a", None)]));

        cache.insert_path(id(1), id(2), &[id(1), id(2)], generation);
        assert!(cache.install_index(index, generation));
        assert!(cache.stats().index_valid);

        cache.on_topic_mutation(&TopicMutation::Deleted(id(2)));

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert!(!stats.index_valid);
        assert_eq!(stats.invalidations, 1);
        assert!(cache.connectivity().is_none());
        assert_eq!(cache.generation(), generation + 1);
    }

    #[test]
    fn test_stale_generation_rejected() {
        let cache = PathCache::default();
        let stale = cache.generation();
        cache.clear();

        assert!(!cache.insert_path(id(1), id(2), &[id(1), id(2)], stale));
        assert!(!cache.install_index(Arc::new(GraphIndex::default()), stale));
        assert_eq!(cache.stats().size, 0);
        assert!(cache.index().is_none());
    }

    #[test]
    fn test_disabled_cache_holds_nothing() {
        let cache = PathCache::disabled();
        let generation = cache.generation();

        assert!(!cache.insert_path(id(1), id(2), &[id(1), id(2)], generation));
        assert!(!cache.install_index(Arc::new(GraphIndex::default()), generation));
        assert!(cache.get_path(id(1), id(2)).is_none());

        let stats = cache.stats();
        assert_eq!(stats.capacity, 0);
        assert!(!stats.index_valid);
    }
}
