//! Path finding over a [`GraphIndex`].
//!
//! All queries are breadth-first searches over the undirected topic graph,
//! so every edge costs one hop and the first time a topic is reached is
//! along a minimum-hop path.
//!
//! ## Tie-breaking
//!
//! Neighbours are expanded in ascending `TopicId` order. Among several
//! minimum-hop paths from `start`, the one returned is the one whose first
//! differing step has the lowest id.
//!
//! ## Depth bound
//!
//! `shortest_path` accepts an optional maximum hop count. If the shortest
//! path needs more hops than the bound, the result is the empty path,
//! exactly as for disconnected topics. Nodes at the bound are never
//! expanded, so a bounded search never scans beyond it.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::index::GraphIndex;
use crate::types::TopicId;

/// Error type for path queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The topic is not a live node of the index.
    #[error("Topic not found: {0}")]
    TopicNotFound(TopicId),
}

/// Breadth-first path queries over a built index.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    index: &'a GraphIndex,
}

impl<'a> PathFinder<'a> {
    /// Create a path finder over an index.
    pub fn new(index: &'a GraphIndex) -> Self {
        Self { index }
    }

    fn ensure_live(&self, id: &TopicId) -> Result<(), PathError> {
        if self.index.contains(id) {
            Ok(())
        } else {
            Err(PathError::TopicNotFound(*id))
        }
    }

    /// Minimum-hop path from `start` to `end`, both inclusive.
    ///
    /// Returns `[start]` when `start == end` and an empty path when `end`
    /// is unreachable within `max_depth` hops (or at all, if unbounded).
    pub fn shortest_path(
        &self,
        start: TopicId,
        end: TopicId,
        max_depth: Option<usize>,
    ) -> Result<Vec<TopicId>, PathError> {
        self.ensure_live(&start)?;
        self.ensure_live(&end)?;

        if start == end {
            return Ok(vec![start]);
        }

        let mut predecessors: HashMap<TopicId, TopicId> = HashMap::new();
        let mut visited: HashSet<TopicId> = HashSet::new();
        let mut queue: VecDeque<(TopicId, usize)> = VecDeque::new();

        visited.insert(start);
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|limit| depth >= limit) {
                continue;
            }

            for &next in self.index.neighbors(&current).into_iter().flatten() {
                if !visited.insert(next) {
                    continue;
                }
                predecessors.insert(next, current);

                if next == end {
                    return Ok(reconstruct(&predecessors, start, end));
                }
                queue.push_back((next, depth + 1));
            }
        }

        Ok(Vec::new())
    }

    /// Hop count between two topics; `None` if they are disconnected.
    pub fn distance(&self, a: TopicId, b: TopicId) -> Result<Option<usize>, PathError> {
        let path = self.shortest_path(a, b, None)?;
        Ok(path.len().checked_sub(1))
    }

    /// Whether a path exists between two topics.
    pub fn are_connected(&self, a: TopicId, b: TopicId) -> Result<bool, PathError> {
        Ok(self.distance(a, b)?.is_some())
    }

    /// Every topic within `max_distance` hops of `center`, with its distance.
    ///
    /// The center itself is always included at distance 0.
    pub fn topics_by_distance(
        &self,
        center: TopicId,
        max_distance: usize,
    ) -> Result<BTreeMap<TopicId, usize>, PathError> {
        self.ensure_live(&center)?;

        let mut distances: BTreeMap<TopicId, usize> = BTreeMap::new();
        let mut frontier: Vec<TopicId> = vec![center];
        distances.insert(center, 0);

        for hop in 1..=max_distance {
            let mut next_frontier = Vec::new();
            for current in &frontier {
                for &next in self.index.neighbors(current).into_iter().flatten() {
                    if let Entry::Vacant(slot) = distances.entry(next) {
                        slot.insert(hop);
                        next_frontier.push(next);
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        Ok(distances)
    }

    /// Every topic within `max_distance` hops of `center`, center included.
    pub fn topics_within_distance(
        &self,
        center: TopicId,
        max_distance: usize,
    ) -> Result<BTreeSet<TopicId>, PathError> {
        Ok(self
            .topics_by_distance(center, max_distance)?
            .into_keys()
            .collect())
    }

    /// Ancestors of a topic, nearest first, following surviving parent links.
    ///
    /// Iterative, so hierarchy depth never bounds the call stack. A cycle in
    /// stored links terminates at the first repeated topic.
    pub fn ancestors(&self, id: TopicId) -> Result<Vec<TopicId>, PathError> {
        self.ensure_live(&id)?;

        let mut seen: HashSet<TopicId> = HashSet::from([id]);
        let mut lineage = Vec::new();
        let mut current = id;

        while let Some(parent) = self.index.parent_of(&current) {
            if !seen.insert(parent) {
                break;
            }
            lineage.push(parent);
            current = parent;
        }

        Ok(lineage)
    }

    /// Descendants of a topic in breadth-first order.
    ///
    /// Level by level, ascending id within a level. Derived from the
    /// persisted parent links only.
    pub fn descendants(&self, id: TopicId) -> Result<Vec<TopicId>, PathError> {
        self.ensure_live(&id)?;

        let mut seen: HashSet<TopicId> = HashSet::from([id]);
        let mut queue: VecDeque<TopicId> = VecDeque::from([id]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.index.children_of(&current) {
                if seen.insert(child) {
                    result.push(child);
                    queue.push_back(child);
                }
            }
        }

        Ok(result)
    }
}

fn reconstruct(predecessors: &HashMap<TopicId, TopicId>, start: TopicId, end: TopicId) -> Vec<TopicId> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        match predecessors.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
