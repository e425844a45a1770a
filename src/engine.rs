//! Topic graph query engine.
//!
//! Ties a [`TopicStore`] to a shared [`PathCache`]. Each query reads the
//! cached [`GraphIndex`] or rebuilds it from the store's live topics, then
//! answers from the index. Results are cached only when computed against
//! the cache generation that was current when the query started.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::cache::{CacheStats, PathCache, TopicMutationListener};
use crate::config::EngineConfig;
use crate::connectivity::{self, ConnectivityReport};
use crate::index::GraphIndex;
use crate::path::{PathError, PathFinder};
use crate::store::TopicStore;
use crate::types::{TopicId, TopicMutation};

/// Error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The topic does not exist or is soft-deleted.
    #[error("Topic not found: {0}")]
    TopicNotFound(TopicId),
    /// A caller-supplied argument was rejected before any graph work.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The topic store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<PathError> for EngineError {
    fn from(e: PathError) -> Self {
        match e {
            PathError::TopicNotFound(id) => Self::TopicNotFound(id),
        }
    }
}

/// Path and connectivity queries over the live topic graph.
///
/// ## Orientation
///
/// Paths are always searched from the lower id to the higher id and
/// reversed for the opposite request, so `(A, B)` and `(B, A)` return
/// mirror images of one path whether or not the cache is warm.
///
/// ## Example
///
/// ```rust,ignore
/// let store = Arc::new(InMemoryTopicStore::new());
/// let cache = Arc::new(PathCache::default());
/// store.subscribe(cache.clone());
///
/// let engine = TopicGraphEngine::new(store, cache);
/// let path = engine.shortest_path(a, b).await?;
/// ```
pub struct TopicGraphEngine<S: TopicStore> {
    store: Arc<S>,
    cache: Arc<PathCache>,
}

impl<S: TopicStore> TopicGraphEngine<S> {
    /// Create an engine over a store and a shared cache.
    pub fn new(store: Arc<S>, cache: Arc<PathCache>) -> Self {
        Self { store, cache }
    }

    /// Create an engine with its own cache built from `config`.
    ///
    /// The caller still has to route topic mutations to [`Self::cache`].
    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            cache: Arc::new(PathCache::new(config.cache)),
        }
    }

    /// Shortest path between two topics, both endpoints included.
    ///
    /// `[start]` when `start == end`; empty when the topics are disconnected.
    pub async fn shortest_path(&self, start: TopicId, end: TopicId) -> Result<Vec<TopicId>, EngineError> {
        self.shortest_path_within(start, end, None).await
    }

    /// Shortest path of at most `max_depth` hops.
    ///
    /// A path needing more hops than the bound is reported as the empty
    /// path, the same as disconnected topics.
    pub async fn shortest_path_within(
        &self,
        start: TopicId,
        end: TopicId,
        max_depth: Option<usize>,
    ) -> Result<Vec<TopicId>, EngineError> {
        require_id(&start, "start")?;
        require_id(&end, "end")?;

        if let Some(path) = self.cache.get_path(start, end) {
            return Ok(bounded(path, max_depth));
        }

        let (index, generation) = self.index_for(&[start, end]).await?;
        let (low, high) = if start <= end { (start, end) } else { (end, start) };

        // No simple path has more hops than the graph has topics
        let search_depth = max_depth.map(|d| d.min(index.node_count()));
        let mut path = PathFinder::new(&index).shortest_path(low, high, search_depth)?;
        if start != low {
            path.reverse();
        }

        // An empty bounded result says nothing about the unbounded answer.
        if max_depth.is_none() || !path.is_empty() {
            self.cache.insert_path(start, end, &path, generation);
        }

        debug!(
            target: "topic_graph::engine",
            %start, %end, hops = path.len().saturating_sub(1), found = !path.is_empty(),
            "shortest path computed"
        );
        Ok(path)
    }

    /// Hop count between two topics; `None` if they are disconnected.
    pub async fn distance(&self, a: TopicId, b: TopicId) -> Result<Option<usize>, EngineError> {
        let path = self.shortest_path(a, b).await?;
        Ok(path.len().checked_sub(1))
    }

    /// Hop count between two topics, `-1` if they are disconnected.
    pub async fn distance_or_negative(&self, a: TopicId, b: TopicId) -> Result<i64, EngineError> {
        Ok(self
            .distance(a, b)
            .await?
            .map_or(-1, |d| i64::try_from(d).unwrap_or(i64::MAX)))
    }

    /// Whether any path joins the two topics.
    pub async fn are_connected(&self, a: TopicId, b: TopicId) -> Result<bool, EngineError> {
        Ok(self.distance(a, b).await?.is_some())
    }

    /// Every topic within `max_distance` hops of `center`, center included.
    pub async fn topics_within_distance(
        &self,
        center: TopicId,
        max_distance: usize,
    ) -> Result<BTreeSet<TopicId>, EngineError> {
        Ok(self
            .topics_by_distance(center, max_distance)
            .await?
            .into_keys()
            .collect())
    }

    /// Every topic within `max_distance` hops of `center`, with its distance.
    pub async fn topics_by_distance(
        &self,
        center: TopicId,
        max_distance: usize,
    ) -> Result<BTreeMap<TopicId, usize>, EngineError> {
        require_id(&center, "center")?;

        let (index, _) = self.index_for(&[center]).await?;
        let radius = max_distance.min(index.node_count());
        Ok(PathFinder::new(&index).topics_by_distance(center, radius)?)
    }

    /// Ancestors of a topic, nearest first.
    pub async fn ancestors(&self, id: TopicId) -> Result<Vec<TopicId>, EngineError> {
        require_id(&id, "id")?;
        let (index, _) = self.index_for(&[id]).await?;
        Ok(PathFinder::new(&index).ancestors(id)?)
    }

    /// Descendants of a topic, breadth-first.
    pub async fn descendants(&self, id: TopicId) -> Result<Vec<TopicId>, EngineError> {
        require_id(&id, "id")?;
        let (index, _) = self.index_for(&[id]).await?;
        Ok(PathFinder::new(&index).descendants(id)?)
    }

    /// Partition the live graph into connected components.
    pub async fn analyze_connectivity(&self) -> Result<ConnectivityReport, EngineError> {
        if let Some(report) = self.cache.connectivity() {
            debug!(target: "topic_graph::engine", "connectivity served from cache");
            return Ok(report.as_ref().clone());
        }

        let (index, generation) = self.index().await?;
        let report = connectivity::analyze(&index);
        debug!(
            target: "topic_graph::engine",
            components = report.component_count,
            isolated = report.isolated_topics.len(),
            "connectivity analyzed"
        );

        self.cache.install_connectivity(Arc::new(report.clone()), generation);
        Ok(report)
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Current cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forward a topic mutation committed outside any subscribed store.
    pub fn notify_mutation(&self, mutation: &TopicMutation) {
        self.cache.on_topic_mutation(mutation);
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<PathCache> {
        &self.cache
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The index plus the generation it belongs to, with `ids` known live.
    ///
    /// On a cold cache the endpoints are looked up first, so a query for an
    /// unknown topic fails without a full rebuild.
    async fn index_for(&self, ids: &[TopicId]) -> Result<(Arc<GraphIndex>, u64), EngineError> {
        if self.cache.index().is_none() {
            for id in ids {
                self.ensure_live_in_store(id).await?;
            }
        }

        let (index, generation) = self.index().await?;
        if let Some(missing) = ids.iter().find(|id| !index.contains(id)) {
            return Err(EngineError::TopicNotFound(*missing));
        }
        Ok((index, generation))
    }

    async fn ensure_live_in_store(&self, id: &TopicId) -> Result<(), EngineError> {
        let exists = self
            .store
            .find_latest_version(id)
            .await
            .map_err(|e| self.store_failure(e))?
            .is_some();
        if !exists {
            return Err(EngineError::TopicNotFound(*id));
        }

        let deleted = self
            .store
            .is_deleted(id)
            .await
            .map_err(|e| self.store_failure(e))?;
        if deleted {
            return Err(EngineError::TopicNotFound(*id));
        }
        Ok(())
    }

    /// The cached index, or a fresh one built from the store.
    async fn index(&self) -> Result<(Arc<GraphIndex>, u64), EngineError> {
        // Read the generation first; an index fetched after it can only be
        // newer, which makes any insert tagged with it a harmless no-op.
        let generation = self.cache.generation();
        if let Some(index) = self.cache.index() {
            return Ok((index, generation));
        }

        let started = Instant::now();
        let topics = self
            .store
            .find_all_live_topics()
            .await
            .map_err(|e| self.store_failure(e))?;

        let index = Arc::new(GraphIndex::build(topics));
        let installed = self.cache.install_index(index.clone(), generation);

        debug!(
            target: "topic_graph::engine",
            nodes = index.node_count(),
            edges = index.edge_count(),
            elapsed_us = started.elapsed().as_micros() as u64,
            installed,
            "graph index rebuilt"
        );
        Ok((index, generation))
    }

    fn store_failure<E: std::error::Error>(&self, e: E) -> EngineError {
        warn!(target: "topic_graph::engine", error = %e, "topic store read failed");
        EngineError::from_store(e)
    }
}

impl<S: TopicStore> std::fmt::Debug for TopicGraphEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicGraphEngine")
            .field("cache", &self.cache)
            .finish()
    }
}

fn require_id(id: &TopicId, name: &str) -> Result<(), EngineError> {
    if id.is_nil() {
        return Err(EngineError::InvalidArgument(format!("{name} is required")));
    }
    Ok(())
}

/// Apply a hop bound to a full shortest path.
fn bounded(path: Vec<TopicId>, max_depth: Option<usize>) -> Vec<TopicId> {
    match max_depth {
        Some(limit) if path.len() > limit + 1 => Vec::new(),
        _ => path,
    }
}
