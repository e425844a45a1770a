//! Topic storage backends.
//!
//! The engine never writes topics; it reads them through [`TopicStore`]
//! and rebuilds its index whenever the cache tells it the graph changed.

pub mod memory;
pub mod json;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use crate::types::{Topic, TopicId};

/// Trait for topic storage backends.
///
/// All methods are async to support async database access.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Fetch every live topic: latest version per id, soft-deleted excluded.
    ///
    /// Backends that cannot resolve versions may return raw records; the
    /// index builder resolves them again.
    async fn find_all_live_topics(&self) -> Result<Vec<Topic>, Self::Error>;

    /// Fetch the latest version of a topic, deleted or not.
    async fn find_latest_version(&self, id: &TopicId) -> Result<Option<Topic>, Self::Error>;

    /// Whether the latest version of a topic is soft-deleted.
    ///
    /// Unknown ids are reported as not deleted.
    async fn is_deleted(&self, id: &TopicId) -> Result<bool, Self::Error>;
}

pub use memory::{InMemoryTopicStore, InMemoryError, TopicUpdate};
pub use json::{JsonFileTopicStore, JsonStoreError};

#[cfg(feature = "postgres")]
pub use postgres::PostgresTopicStore;
