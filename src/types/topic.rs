//! Topic types for the graph kernel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a logical topic.
///
/// Shared by every version of the same topic. Wraps a UUID and implements
/// `Ord` so that adjacency sets iterate in a deterministic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(Uuid);

impl TopicId {
    /// Create a new TopicId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new TopicId from a UUID string.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Whether this is the nil UUID (used by callers for "no id given").
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Generate a new random TopicId.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TopicId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// One stored version of a topic.
///
/// Versions of the same logical topic share `id` and differ in `version`.
/// Only the latest, non-deleted version takes part in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Logical topic identifier.
    pub id: TopicId,
    /// Display name.
    pub name: String,
    /// Body text.
    #[serde(default)]
    pub content: String,
    /// Version number, starting at 1.
    pub version: u32,
    /// Parent topic; `None` for roots.
    #[serde(default)]
    pub parent_topic_id: Option<TopicId>,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// When the logical topic was first created.
    pub created_at: DateTime<Utc>,
    /// When this version was written.
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// Create the first version of a topic.
    pub fn new(id: TopicId, name: impl Into<String>, parent_topic_id: Option<TopicId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            content: String::new(),
            version: 1,
            parent_topic_id,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the body text.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Produce the next version: a full copy with `version + 1`.
    pub fn next_version(&self) -> Self {
        Self {
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Whether this version is a root of the hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent_topic_id.is_none()
    }

    /// Parent link, ignoring a self-reference.
    ///
    /// Stores reject self-parenting; a record that slipped through is
    /// treated as a root.
    pub fn parent(&self) -> Option<TopicId> {
        self.parent_topic_id.filter(|p| *p != self.id)
    }
}

/// Resolve a raw record collection to the live topic set.
///
/// For each id keeps the highest version, then drops it if that version
/// is soft-deleted. The result is ordered by `TopicId`.
pub fn resolve_live<I>(topics: I) -> Vec<Topic>
where
    I: IntoIterator<Item = Topic>,
{
    let mut latest: BTreeMap<TopicId, Topic> = BTreeMap::new();

    for topic in topics {
        let newer = latest
            .get(&topic.id)
            .map_or(true, |existing| topic.version > existing.version);
        if newer {
            latest.insert(topic.id, topic);
        }
    }

    latest.into_values().filter(|t| !t.deleted).collect()
}

/// A graph-affecting change to the topic set.
///
/// Emitted by stores after every write; consumed by
/// [`TopicMutationListener`](crate::cache::TopicMutationListener)s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "topicId", rename_all = "snake_case")]
pub enum TopicMutation {
    /// A new topic was created.
    Created(TopicId),
    /// A new version of a topic was written.
    Updated(TopicId),
    /// A topic was soft-deleted.
    Deleted(TopicId),
    /// A soft-deleted topic was restored.
    Restored(TopicId),
}

impl TopicMutation {
    /// The topic the mutation applies to.
    pub fn topic_id(&self) -> TopicId {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Deleted(id) | Self::Restored(id) => *id,
        }
    }
}

impl fmt::Display for TopicMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(id) => write!(f, "created {}", id),
            Self::Updated(id) => write!(f, "updated {}", id),
            Self::Deleted(id) => write!(f, "deleted {}", id),
            Self::Restored(id) => write!(f, "restored {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> TopicId {
        TopicId::new(Uuid::from_u128(n))
    }

    #[test]
    fn test_topic_id_ordering() {
        let id1 = TopicId::from_str("00000000-0000-0000-0000-000000000001").unwrap();
        let id2 = TopicId::from_str("00000000-0000-0000-0000-000000000002").unwrap();
        assert!(id1 < id2);
    }

    #[test]
    fn test_nil_id() {
        assert!(TopicId::new(Uuid::nil()).is_nil());
        assert!(!id(1).is_nil());
    }

    #[test]
    fn test_next_version_keeps_identity() {
        let v1 = Topic::new(id(1), "Rust", Some(id(2)));
        let v2 = v1.next_version();

        assert_eq!(v2.id, v1.id);
        assert_eq!(v2.version, 2);
        assert_eq!(v2.parent_topic_id, Some(id(2)));
        assert_eq!(v2.created_at, v1.created_at);
    }

    #[test]
    fn test_self_parent_ignored() {
        let topic = Topic::new(id(1), "loop", Some(id(1)));
        assert_eq!(topic.parent(), None);
    }

    #[test]
    fn test_resolve_live_picks_latest_version() {
        let v1 = Topic::new(id(1), "a", None);
        let mut v2 = v1.next_version();
        v2.parent_topic_id = Some(id(2));

        // Order of records must not matter
        let live = resolve_live(vec![v2.clone(), v1]);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].version, 2);
        assert_eq!(live[0].parent_topic_id, Some(id(2)));
    }

    #[test]
    fn test_resolve_live_drops_deleted_latest() {
        let v1 = Topic::new(id(1), "a", None);
        let mut v2 = v1.next_version();
        v2.deleted = true;
        let other = Topic::new(id(2), "b", None);

        let live = resolve_live(vec![v1, v2, other]);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, id(2));
    }

    #[test]
    fn test_resolve_live_restored_after_delete() {
        let v1 = Topic::new(id(1), "a", None);
        let mut v2 = v1.next_version();
        v2.deleted = true;
        let mut v3 = v2.next_version();
        v3.deleted = false;

        let live = resolve_live(vec![v1, v2, v3]);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].version, 3);
    }

    #[test]
    fn test_topic_json_shape() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000002",
            "name": "Child",
            "version": 3,
            "parentTopicId": "00000000-0000-0000-0000-000000000001",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }"#;

        let topic: Topic = serde_json::from_str(json).unwrap();
        assert_eq!(topic.id, id(2));
        assert_eq!(topic.parent_topic_id, Some(id(1)));
        assert_eq!(topic.version, 3);
        assert!(!topic.deleted);
        assert!(topic.content.is_empty());
    }

    #[test]
    fn test_mutation_topic_id() {
        assert_eq!(TopicMutation::Deleted(id(7)).topic_id(), id(7));
        assert_eq!(TopicMutation::Restored(id(7)).to_string(), format!("restored {}", id(7)));
    }
}
