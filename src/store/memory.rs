//! In-memory topic store.
//!
//! Keeps the full version history of every topic and publishes a
//! [`TopicMutation`] to registered listeners after each write. Used by the
//! test suite and by embedders that keep their topic set in process.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cache::TopicMutationListener;
use crate::types::{Topic, TopicId, TopicMutation};
use super::TopicStore;

/// Error type for in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InMemoryError {
    /// Topic not found.
    #[error("Topic not found: {0}")]
    TopicNotFound(TopicId),
    /// A topic with this id already exists.
    #[error("Topic already exists: {0}")]
    AlreadyExists(TopicId),
    /// The topic names itself as parent.
    #[error("Topic cannot be its own parent: {0}")]
    SelfParent(TopicId),
    /// The parent is unknown or soft-deleted.
    #[error("Parent topic not found: {0}")]
    ParentNotFound(TopicId),
    /// The topic is soft-deleted and cannot be modified.
    #[error("Topic is deleted: {0}")]
    Deleted(TopicId),
    /// Restore was requested for a topic that is not deleted.
    #[error("Topic is not deleted: {0}")]
    NotDeleted(TopicId),
    /// Reads are failing (simulated outage).
    #[error("Topic store unavailable")]
    Unavailable,
}

/// Changes applied by [`InMemoryTopicStore::update`].
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TopicUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New body text.
    pub content: Option<String>,
    /// New parent; `Some(None)` turns the topic into a root.
    pub parent_topic_id: Option<Option<TopicId>>,
}

impl TopicUpdate {
    /// An update that only moves the topic under a new parent.
    pub fn reparent(parent: Option<TopicId>) -> Self {
        Self {
            parent_topic_id: Some(parent),
            ..Self::default()
        }
    }
}

/// In-memory topic store with version history.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Default)]
pub struct InMemoryTopicStore {
    /// Versions per topic, oldest first.
    versions: RwLock<BTreeMap<TopicId, Vec<Topic>>>,
    /// Receivers of mutation events.
    listeners: RwLock<Vec<Arc<dyn TopicMutationListener>>>,
    /// When set, every read fails with `Unavailable`.
    unavailable: AtomicBool,
}

impl InMemoryTopicStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for topic mutations.
    pub fn subscribe(&self, listener: Arc<dyn TopicMutationListener>) {
        self.listeners.write().push(listener);
    }

    fn notify(&self, mutation: TopicMutation) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_topic_mutation(&mutation);
        }
    }

    fn ensure_parent(
        versions: &BTreeMap<TopicId, Vec<Topic>>,
        id: TopicId,
        parent: Option<TopicId>,
    ) -> Result<(), InMemoryError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if parent == id {
            return Err(InMemoryError::SelfParent(id));
        }
        match versions.get(&parent).and_then(|v| v.last()) {
            Some(p) if !p.deleted => Ok(()),
            _ => Err(InMemoryError::ParentNotFound(parent)),
        }
    }

    /// Create the first version of a topic.
    ///
    /// The stored record always starts at version 1 and not deleted.
    pub fn create(&self, topic: Topic) -> Result<Topic, InMemoryError> {
        let created = {
            let mut versions = self.versions.write();
            if versions.contains_key(&topic.id) {
                return Err(InMemoryError::AlreadyExists(topic.id));
            }
            Self::ensure_parent(&versions, topic.id, topic.parent_topic_id)?;

            let created = Topic {
                version: 1,
                deleted: false,
                ..topic
            };
            versions.insert(created.id, vec![created.clone()]);
            created
        };

        self.notify(TopicMutation::Created(created.id));
        Ok(created)
    }

    /// Write a new version of a live topic.
    pub fn update(&self, id: &TopicId, update: TopicUpdate) -> Result<Topic, InMemoryError> {
        let next = {
            let mut versions = self.versions.write();
            let latest = versions
                .get(id)
                .and_then(|v| v.last())
                .ok_or(InMemoryError::TopicNotFound(*id))?;
            if latest.deleted {
                return Err(InMemoryError::Deleted(*id));
            }

            let mut next = latest.next_version();
            if let Some(name) = update.name {
                next.name = name;
            }
            if let Some(content) = update.content {
                next.content = content;
            }
            if let Some(parent) = update.parent_topic_id {
                Self::ensure_parent(&versions, *id, parent)?;
                next.parent_topic_id = parent;
            }

            versions.entry(*id).or_default().push(next.clone());
            next
        };

        self.notify(TopicMutation::Updated(*id));
        Ok(next)
    }

    /// Soft-delete the latest version of a topic.
    pub fn soft_delete(&self, id: &TopicId) -> Result<(), InMemoryError> {
        self.set_deleted(id, true)?;
        self.notify(TopicMutation::Deleted(*id));
        Ok(())
    }

    /// Undo a soft delete.
    pub fn restore(&self, id: &TopicId) -> Result<(), InMemoryError> {
        self.set_deleted(id, false)?;
        self.notify(TopicMutation::Restored(*id));
        Ok(())
    }

    fn set_deleted(&self, id: &TopicId, deleted: bool) -> Result<(), InMemoryError> {
        let mut versions = self.versions.write();
        let latest = versions
            .get_mut(id)
            .and_then(|v| v.last_mut())
            .ok_or(InMemoryError::TopicNotFound(*id))?;

        match (latest.deleted, deleted) {
            (true, true) => Err(InMemoryError::Deleted(*id)),
            (false, false) => Err(InMemoryError::NotDeleted(*id)),
            _ => {
                latest.deleted = deleted;
                latest.updated_at = chrono::Utc::now();
                Ok(())
            }
        }
    }

    /// Insert a stored record as-is, bypassing validation.
    ///
    /// Used to load existing history (including deleted versions or
    /// out-of-order records). Versions are kept sorted.
    pub fn insert_raw(&self, topic: Topic) {
        let id = topic.id;
        {
            let mut versions = self.versions.write();
            let history = versions.entry(id).or_default();
            history.push(topic);
            history.sort_by_key(|t| t.version);
        }
        self.notify(TopicMutation::Updated(id));
    }

    /// All stored versions of a topic, oldest first.
    pub fn history(&self, id: &TopicId) -> Vec<Topic> {
        self.versions.read().get(id).cloned().unwrap_or_default()
    }

    /// Number of logical topics, deleted ones included.
    pub fn num_topics(&self) -> usize {
        self.versions.read().len()
    }

    /// Simulate an outage: while set, every read fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), InMemoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(InMemoryError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for InMemoryTopicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTopicStore")
            .field("topics", &self.num_topics())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

#[async_trait]
impl TopicStore for InMemoryTopicStore {
    type Error = InMemoryError;

    async fn find_all_live_topics(&self) -> Result<Vec<Topic>, Self::Error> {
        self.check_available()?;
        Ok(self
            .versions
            .read()
            .values()
            .filter_map(|v| v.last())
            .filter(|t| !t.deleted)
            .cloned()
            .collect())
    }

    async fn find_latest_version(&self, id: &TopicId) -> Result<Option<Topic>, Self::Error> {
        self.check_available()?;
        Ok(self.versions.read().get(id).and_then(|v| v.last()).cloned())
    }

    async fn is_deleted(&self, id: &TopicId) -> Result<bool, Self::Error> {
        self.check_available()?;
        Ok(self
            .versions
            .read()
            .get(id)
            .and_then(|v| v.last())
            .map_or(false, |t| t.deleted))
    }
}
