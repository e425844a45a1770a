//! JSON-file topic store.
//!
//! Reads a JSON array of raw topic records, every stored version included,
//! in the layout the knowledge-base backend persists them:
//!
//! ```json
//! [
//!   { "id": "…", "name": "Rust", "version": 2, "parentTopicId": null,
//!     "deleted": false, "createdAt": "…", "updatedAt": "…" }
//! ]
//! ```
//!
//! The store is a read-only snapshot of the file. [`JsonFileTopicStore::reload`]
//! re-reads it and publishes one [`TopicMutation`] per topic whose latest
//! version changed, so a subscribed path cache drops stale answers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cache::TopicMutationListener;
use crate::types::{resolve_live, Topic, TopicId, TopicMutation};
use super::TopicStore;

/// Error type for the JSON-file store.
#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid topic array.
    #[error("Invalid topic JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Topic store backed by a JSON file.
pub struct JsonFileTopicStore {
    path: Option<PathBuf>,
    /// Latest version per topic, deleted ones included.
    latest: RwLock<BTreeMap<TopicId, Topic>>,
    /// Receivers of reload changes.
    listeners: RwLock<Vec<Arc<dyn TopicMutationListener>>>,
}

impl JsonFileTopicStore {
    /// Load a store from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JsonStoreError> {
        let path = path.as_ref().to_path_buf();
        let latest = Self::read_file(&path)?;
        tracing::debug!(path = %path.display(), topics = latest.len(), "Loaded topic file");
        Ok(Self {
            path: Some(path),
            latest: RwLock::new(latest),
            listeners: RwLock::new(Vec::new()),
        })
    }

    /// Build a store from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, JsonStoreError> {
        let records: Vec<Topic> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Build a store from raw records.
    pub fn from_records(records: Vec<Topic>) -> Self {
        Self {
            path: None,
            latest: RwLock::new(latest_versions(records)),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener for topic changes picked up by [`reload`](Self::reload).
    pub fn subscribe(&self, listener: Arc<dyn TopicMutationListener>) {
        self.listeners.write().push(listener);
    }

    /// Re-read the backing file. No-op for stores built from a string.
    ///
    /// Returns the changes found, in topic order. Listeners are notified
    /// after the new snapshot is visible to readers.
    pub fn reload(&self) -> Result<Vec<TopicMutation>, JsonStoreError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let latest = Self::read_file(path)?;

        let changes = {
            let mut current = self.latest.write();
            let changes = diff_snapshots(&current, &latest);
            *current = latest;
            changes
        };

        if !changes.is_empty() {
            tracing::debug!(path = %path.display(), changes = changes.len(), "Topic file changed");
            let listeners = self.listeners.read().clone();
            for mutation in &changes {
                for listener in &listeners {
                    listener.on_topic_mutation(mutation);
                }
            }
        }
        Ok(changes)
    }

    fn read_file(path: &Path) -> Result<BTreeMap<TopicId, Topic>, JsonStoreError> {
        let bytes = std::fs::read(path).map_err(|source| JsonStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<Topic> = serde_json::from_slice(&bytes)?;
        Ok(latest_versions(records))
    }

    /// Number of logical topics in the file, deleted ones included.
    pub fn num_topics(&self) -> usize {
        self.latest.read().len()
    }
}

fn latest_versions(records: Vec<Topic>) -> BTreeMap<TopicId, Topic> {
    let mut latest: BTreeMap<TopicId, Topic> = BTreeMap::new();
    for record in records {
        let newer = latest
            .get(&record.id)
            .map_or(true, |existing| record.version > existing.version);
        if newer {
            latest.insert(record.id, record);
        }
    }
    latest
}

/// Classify every topic whose latest version differs between two snapshots.
fn diff_snapshots(
    old: &BTreeMap<TopicId, Topic>,
    new: &BTreeMap<TopicId, Topic>,
) -> Vec<TopicMutation> {
    let mut changes = Vec::new();

    for (id, before) in old {
        match new.get(id) {
            None if !before.deleted => changes.push(TopicMutation::Deleted(*id)),
            None => {}
            Some(after) if after == before => {}
            Some(after) => changes.push(match (before.deleted, after.deleted) {
                (false, true) => TopicMutation::Deleted(*id),
                (true, false) => TopicMutation::Restored(*id),
                _ => TopicMutation::Updated(*id),
            }),
        }
    }
    for id in new.keys().filter(|id| !old.contains_key(id)) {
        changes.push(TopicMutation::Created(*id));
    }

    changes.sort_by_key(|m| m.topic_id());
    changes
}

impl std::fmt::Debug for JsonFileTopicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileTopicStore")
            .field("path", &self.path)
            .field("topics", &self.num_topics())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

#[async_trait]
impl TopicStore for JsonFileTopicStore {
    type Error = JsonStoreError;

    async fn find_all_live_topics(&self) -> Result<Vec<Topic>, Self::Error> {
        Ok(resolve_live(self.latest.read().values().cloned()))
    }

    async fn find_latest_version(&self, id: &TopicId) -> Result<Option<Topic>, Self::Error> {
        Ok(self.latest.read().get(id).cloned())
    }

    async fn is_deleted(&self, id: &TopicId) -> Result<bool, Self::Error> {
        Ok(self.latest.read().get(id).map_or(false, |t| t.deleted))
    }
}
