//! PostgreSQL topic store.
//!
//! Reads the knowledge-base `topics` table, one row per stored version:
//!
//! ```sql
//! CREATE TABLE topics (
//!     id              UUID        NOT NULL,
//!     version         INTEGER     NOT NULL,
//!     name            TEXT        NOT NULL,
//!     content         TEXT        NOT NULL DEFAULT '',
//!     parent_topic_id UUID,
//!     deleted         BOOLEAN     NOT NULL DEFAULT FALSE,
//!     created_at      TIMESTAMPTZ NOT NULL,
//!     updated_at      TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (id, version)
//! );
//! ```
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

use crate::config::env_or;
use crate::types::{Topic, TopicId};
use super::TopicStore;

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/knowledge_base".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

const TOPIC_COLUMNS: &str =
    "id, version, name, content, parent_topic_id, deleted, created_at, updated_at";

/// PostgreSQL topic store.
///
/// Version resolution happens in SQL (`DISTINCT ON (id) ... ORDER BY id,
/// version DESC`), so only one row per logical topic crosses the wire.
pub struct PostgresTopicStore {
    pool: PgPool,
}

impl PostgresTopicStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Parse a topic from a database row.
    fn parse_topic_row(row: &PgRow) -> Result<Topic, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        let version: i32 = row.try_get("version")?;
        let parent: Option<Uuid> = row.try_get("parent_topic_id")?;

        Ok(Topic {
            id: TopicId::new(id),
            name: row.try_get("name")?,
            content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
            version: u32::try_from(version).unwrap_or(1),
            parent_topic_id: parent.map(TopicId::new),
            deleted: row.try_get("deleted")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl TopicStore for PostgresTopicStore {
    type Error = sqlx::Error;

    async fn find_all_live_topics(&self) -> Result<Vec<Topic>, Self::Error> {
        let sql = format!(
            r#"
            SELECT {TOPIC_COLUMNS} FROM (
                SELECT DISTINCT ON (id) {TOPIC_COLUMNS}
                FROM topics
                ORDER BY id, version DESC
            ) latest
            WHERE NOT deleted
            ORDER BY id
            "#
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(Self::parse_topic_row).collect()
    }

    async fn find_latest_version(&self, id: &TopicId) -> Result<Option<Topic>, Self::Error> {
        let sql = format!(
            r#"
            SELECT {TOPIC_COLUMNS}
            FROM topics
            WHERE id = $1
            ORDER BY version DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_topic_row).transpose()
    }

    async fn is_deleted(&self, id: &TopicId) -> Result<bool, Self::Error> {
        let row = sqlx::query(
            r#"
            SELECT deleted
            FROM topics
            WHERE id = $1
            ORDER BY version DESC
            LIMIT 1
            "#
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => r.try_get("deleted"),
            None => Ok(false),
        }
    }
}
