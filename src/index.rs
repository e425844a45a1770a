//! Graph index builder.
//!
//! Converts the topic collection returned by a [`TopicStore`](crate::store::TopicStore)
//! into an undirected adjacency structure. Only live topics (latest version,
//! not soft-deleted) become nodes, and an edge is only added when both the
//! child and its parent are live. A child whose parent is deleted stays in
//! the index as a node without that edge; it is never re-attached to a
//! grandparent.
//!
//! The index is a transient value: it is rebuilt from scratch whenever the
//! cache holding it is invalidated.

use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::shape_fingerprint;
use crate::types::{resolve_live, Edge, Topic, TopicId};

/// Undirected adjacency over live topics.
///
/// Uses BTreeMap/BTreeSet so neighbours iterate in ascending `TopicId`
/// order; every traversal built on top of it is deterministic.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    /// Topic -> neighbours (parent and children). Every live topic is a key.
    adjacency: BTreeMap<TopicId, BTreeSet<TopicId>>,
    /// Child -> parent, for surviving links only.
    parents: BTreeMap<TopicId, TopicId>,
    /// Parent -> children, for surviving links only.
    children: BTreeMap<TopicId, BTreeSet<TopicId>>,
    /// Number of distinct undirected edges.
    edge_count: usize,
    /// Hash of the sorted node and edge lists.
    fingerprint: String,
}

impl GraphIndex {
    /// Build the index from a topic collection.
    ///
    /// The collection may hold every stored version, including deleted
    /// ones; version resolution is applied here so the builder only ever
    /// admits live topics.
    pub fn build<I>(topics: I) -> Self
    where
        I: IntoIterator<Item = Topic>,
    {
        let live = resolve_live(topics);

        let mut adjacency: BTreeMap<TopicId, BTreeSet<TopicId>> = live
            .iter()
            .map(|t| (t.id, BTreeSet::new()))
            .collect();
        let mut parents = BTreeMap::new();
        let mut children: BTreeMap<TopicId, BTreeSet<TopicId>> = BTreeMap::new();

        for topic in &live {
            let Some(parent) = topic.parent() else {
                continue;
            };
            // Parent must be live too; no grandparent re-attachment.
            if !adjacency.contains_key(&parent) {
                continue;
            }

            parents.insert(topic.id, parent);
            children.entry(parent).or_default().insert(topic.id);

            if let Some(set) = adjacency.get_mut(&topic.id) {
                set.insert(parent);
            }
            if let Some(set) = adjacency.get_mut(&parent) {
                set.insert(topic.id);
            }
        }

        // A two-topic cycle stores two links but yields one undirected edge
        let edge_count = adjacency.values().map(BTreeSet::len).sum::<usize>() / 2;

        let mut index = Self {
            adjacency,
            parents,
            children,
            edge_count,
            fingerprint: String::new(),
        };
        index.fingerprint = index.compute_fingerprint();
        index
    }

    fn compute_fingerprint(&self) -> String {
        shape_fingerprint(self.adjacency.keys(), self.edges().iter())
    }

    /// Whether the topic is a live node.
    pub fn contains(&self, id: &TopicId) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Neighbours of a topic in ascending id order.
    ///
    /// Returns `None` if the topic is not in the index.
    pub fn neighbors(&self, id: &TopicId) -> Option<&BTreeSet<TopicId>> {
        self.adjacency.get(id)
    }

    /// Number of neighbours, or `None` if the topic is not in the index.
    pub fn degree(&self, id: &TopicId) -> Option<usize> {
        self.adjacency.get(id).map(BTreeSet::len)
    }

    /// Surviving parent of a topic.
    pub fn parent_of(&self, id: &TopicId) -> Option<TopicId> {
        self.parents.get(id).copied()
    }

    /// Surviving children of a topic, ascending.
    pub fn children_of(&self, id: &TopicId) -> impl Iterator<Item = TopicId> + '_ {
        self.children.get(id).into_iter().flatten().copied()
    }

    /// All live topic ids, ascending.
    pub fn node_ids(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.adjacency.keys().copied()
    }

    /// All stored links between live topics, sorted by (parent, child).
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .parents
            .iter()
            .map(|(child, parent)| Edge::new(*parent, *child))
            .collect();
        edges.sort();
        edges
    }

    /// Number of live topics.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Whether the index has no nodes.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Deterministic hash of the graph shape.
    ///
    /// Two indexes with the same live topics and edges have the same
    /// fingerprint regardless of input order or version history.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn id(n: u128) -> TopicId {
        TopicId::new(Uuid::from_u128(n))
    }

    fn topic(n: u128, parent: Option<u128>) -> Topic {
        Topic::new(id(n), format!("topic-{}", n), parent.map(id))
    }

    #[test]
    fn test_chain_and_isolated() {
        // 1 <- 2 <- 3, 4 alone
        let index = GraphIndex::build(vec![
            topic(1, None),
            topic(2, Some(1)),
            topic(3, Some(2)),
            topic(4, None),
        ]);

        assert_eq!(index.node_count(), 4);
        assert_eq!(index.edge_count(), 2);
        assert_eq!(index.degree(&id(2)), Some(2));
        assert_eq!(index.degree(&id(4)), Some(0));
        assert!(index.neighbors(&id(1)).unwrap().contains(&id(2)));
        assert!(index.neighbors(&id(2)).unwrap().contains(&id(1)));
    }

    #[test]
    fn test_deleted_topic_is_not_a_node() {
        let mut deleted = topic(2, Some(1)).next_version();
        deleted.deleted = true;

        let index = GraphIndex::build(vec![
            topic(1, None),
            topic(2, Some(1)),
            deleted,
            topic(3, Some(2)),
        ]);

        assert!(!index.contains(&id(2)));
        assert_eq!(index.node_count(), 2);
        // 3 keeps no edge and is not re-attached to 1
        assert_eq!(index.degree(&id(3)), Some(0));
        assert_eq!(index.parent_of(&id(3)), None);
        assert_eq!(index.degree(&id(1)), Some(0));
    }

    #[test]
    fn test_only_latest_version_links() {
        let v1 = topic(3, Some(1));
        let mut v2 = v1.next_version();
        v2.parent_topic_id = Some(id(2));

        let index = GraphIndex::build(vec![topic(1, None), topic(2, None), v1, v2]);

        assert_eq!(index.parent_of(&id(3)), Some(id(2)));
        assert_eq!(index.degree(&id(1)), Some(0));
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn test_unknown_parent_ignored() {
        let index = GraphIndex::build(vec![topic(1, Some(99))]);
        assert_eq!(index.node_count(), 1);
        assert_eq!(index.edge_count(), 0);
    }

    #[test]
    fn test_two_cycle_counts_one_edge() {
        let index = GraphIndex::build(vec![topic(1, Some(2)), topic(2, Some(1))]);
        assert_eq!(index.edge_count(), 1);
        assert_eq!(index.degree(&id(1)), Some(1));
    }

    #[test]
    fn test_children_of_sorted() {
        let index = GraphIndex::build(vec![
            topic(1, None),
            topic(4, Some(1)),
            topic(2, Some(1)),
            topic(3, Some(1)),
        ]);
        let children: Vec<_> = index.children_of(&id(1)).collect();
        assert_eq!(children, vec![id(2), id(3), id(4)]);
        assert_eq!(index.children_of(&id(4)).count(), 0);
    }

    #[test]
    fn test_fingerprint_order_independent() {
        let a = GraphIndex::build(vec![topic(1, None), topic(2, Some(1)), topic(3, Some(1))]);
        let b = GraphIndex::build(vec![topic(3, Some(1)), topic(1, None), topic(2, Some(1))]);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = GraphIndex::build(vec![topic(1, None), topic(2, Some(1)), topic(3, None)]);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_empty_index() {
        let index = GraphIndex::build(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.edge_count(), 0);
        assert!(index.edges().is_empty());
    }
}
