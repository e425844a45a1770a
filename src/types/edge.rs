//! Edge types for the graph kernel.

use serde::{Deserialize, Serialize};
use super::topic::TopicId;

/// Stored hierarchy link between two live topics.
///
/// Stored direction is child → parent; traversal treats it as undirected.
/// Implements `Ord` for deterministic ordering: (parent, child).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent topic.
    pub parent: TopicId,
    /// Child topic.
    pub child: TopicId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(parent: TopicId, child: TopicId) -> Self {
        Self { parent, child }
    }
}
