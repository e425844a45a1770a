//! Canonical graph-shape hashing.
//!
//! ## Determinism Guarantees
//!
//! - Ids are hashed as their 16 raw UUID bytes, never through a text or
//!   serde encoding, so hashing cannot fail and is platform independent
//! - Node and edge sections are length-prefixed, so moving an id from one
//!   section to the other always changes the digest
//! - Callers must feed nodes and edges in sorted order

use xxhash_rust::xxh64::Xxh64;

use crate::types::{Edge, TopicId};

/// Streaming xxh64 over a graph's sorted nodes and edges.
pub struct ShapeHasher {
    state: Xxh64,
}

impl ShapeHasher {
    /// Start a new digest.
    pub fn new() -> Self {
        Self { state: Xxh64::new(0) }
    }

    /// Mark the start of a section holding `len` items.
    pub fn section(&mut self, len: usize) -> &mut Self {
        self.state.update(&(len as u64).to_le_bytes());
        self
    }

    /// Feed one topic id.
    pub fn id(&mut self, id: &TopicId) -> &mut Self {
        self.state.update(id.as_uuid().as_bytes());
        self
    }

    /// Feed one edge as (parent, child).
    pub fn edge(&mut self, edge: &Edge) -> &mut Self {
        self.id(&edge.parent).id(&edge.child)
    }

    /// Finish as a 16-character lowercase hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.state.digest())
    }
}

impl Default for ShapeHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint of a graph given its sorted nodes and sorted edges.
pub fn shape_fingerprint<'a, N, E>(nodes: N, edges: E) -> String
where
    N: ExactSizeIterator<Item = &'a TopicId>,
    E: ExactSizeIterator<Item = &'a Edge>,
{
    let mut hasher = ShapeHasher::new();

    hasher.section(nodes.len());
    for node in nodes {
        hasher.id(node);
    }

    hasher.section(edges.len());
    for edge in edges {
        hasher.edge(edge);
    }

    hasher.finish_hex()
}
