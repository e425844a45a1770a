//! # topic-graph-kernel
//!
//! Path finding and connectivity analysis over a versioned topic hierarchy.
//!
//! Topics form a forest through their optional `parent_topic_id`. The
//! kernel treats every surviving parent link as an undirected edge and
//! answers:
//!
//! - shortest paths and hop distances between two topics
//! - which topics lie within *N* hops of a center
//! - how the live graph partitions into connected components
//!
//! ## Architecture
//!
//! ```text
//! TopicStore ──► GraphIndex::build ──► PathFinder / connectivity::analyze
//!   (Memory,          │
//!    JSON file,       ▼
//!    Postgres)    PathCache ◄── TopicMutationListener (store writes)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same live topics → same index fingerprint
//! - Neighbours are expanded in ascending `TopicId` order, so equal-length
//!   paths are always resolved the same way
//! - `(A, B)` and `(B, A)` return mirror images of one path
//!
//! ## Live topics
//!
//! Only the latest version of each topic counts, and only if it is not
//! soft-deleted. A link to a parent that is not live is dropped from the
//! graph; the child stays.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod store;
pub mod index;
pub mod path;
pub mod connectivity;
pub mod cache;
pub mod engine;
pub mod config;
pub mod canonical;

// Re-exports
pub use types::{TopicId, Topic, TopicMutation, Edge, resolve_live};
pub use store::{TopicStore, InMemoryTopicStore, JsonFileTopicStore, TopicUpdate};
#[cfg(feature = "postgres")]
pub use store::PostgresTopicStore;
pub use index::GraphIndex;
pub use path::{PathFinder, PathError};
pub use connectivity::{analyze, ConnectivityReport};
pub use cache::{PathCache, CacheConfig, CacheStats, PathKey, TopicMutationListener};
pub use engine::{TopicGraphEngine, EngineError};
pub use config::EngineConfig;
pub use canonical::{shape_fingerprint, ShapeHasher};
