//! Whole-graph connectivity analysis.
//!
//! Partitions the live topics into connected components with repeated
//! breadth-first searches, always starting from the lowest unvisited id.
//! The analysis is O(V + E) and always computed from scratch; callers that
//! want reuse go through the engine, which keeps the last report in the
//! [`PathCache`](crate::cache::PathCache).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::index::GraphIndex;
use crate::types::TopicId;

/// Result of a connectivity analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    /// Whether every live topic is reachable from every other.
    ///
    /// An empty graph counts as fully connected.
    pub is_fully_connected: bool,
    /// Number of connected components.
    pub component_count: usize,
    /// Topics with no surviving parent or child edge, ascending.
    pub isolated_topics: Vec<TopicId>,
    /// Component members, each sorted ascending; components ordered by
    /// their smallest member.
    pub components: Vec<Vec<TopicId>>,
    /// Fingerprint of the graph shape this report was computed against.
    pub graph_fingerprint: String,
}

impl ConnectivityReport {
    /// The largest component (lowest smallest-member wins ties).
    pub fn largest_component(&self) -> Option<&[TopicId]> {
        self.components
            .iter()
            .fold(None::<&Vec<TopicId>>, |best, c| match best {
                Some(b) if b.len() >= c.len() => Some(b),
                _ => Some(c),
            })
            .map(Vec::as_slice)
    }

    /// Total number of topics covered by the partition.
    pub fn topic_count(&self) -> usize {
        self.components.iter().map(Vec::len).sum()
    }

    /// Whether the topic is isolated.
    pub fn is_isolated(&self, id: &TopicId) -> bool {
        self.isolated_topics.binary_search(id).is_ok()
    }
}

/// Partition the index into connected components.
pub fn analyze(index: &GraphIndex) -> ConnectivityReport {
    let mut visited: BTreeSet<TopicId> = BTreeSet::new();
    let mut components: Vec<Vec<TopicId>> = Vec::new();
    let mut isolated_topics: Vec<TopicId> = Vec::new();

    for seed in index.node_ids() {
        if visited.contains(&seed) {
            continue;
        }

        if index.degree(&seed) == Some(0) {
            isolated_topics.push(seed);
        }

        visited.insert(seed);
        let mut members = vec![seed];
        let mut queue: VecDeque<TopicId> = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            for &next in index.neighbors(&current).into_iter().flatten() {
                if visited.insert(next) {
                    members.push(next);
                    queue.push_back(next);
                }
            }
        }

        members.sort();
        components.push(members);
    }

    ConnectivityReport {
        is_fully_connected: components.len() <= 1,
        component_count: components.len(),
        isolated_topics,
        components,
        graph_fingerprint: index.fingerprint().to_string(),
    }
}
