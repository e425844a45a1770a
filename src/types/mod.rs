//! Core topic graph types.

pub mod topic;
pub mod edge;

pub use topic::{TopicId, Topic, TopicMutation, resolve_live};
pub use edge::Edge;
