//! Engine configuration.
//!
//! Every setting has a production default and can be overridden from the
//! environment:
//! - `TOPIC_GRAPH_CACHE_CAPACITY`: Maximum cached paths (default: 1000)
//! - `TOPIC_GRAPH_CACHE_ENABLED`: `true`/`false` (default: true)
//!
//! Unparsable values fall back to the default.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::cache::CacheConfig;

/// Configuration for [`TopicGraphEngine`](crate::engine::TopicGraphEngine).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path cache settings.
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        Self {
            cache: CacheConfig {
                max_entries: env_or("TOPIC_GRAPH_CACHE_CAPACITY", defaults.max_entries),
                enabled: env_or("TOPIC_GRAPH_CACHE_ENABLED", defaults.enabled),
            },
        }
    }
}

/// Read and parse an environment variable, falling back to `default`.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache.max_entries, 1_000);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        std::env::set_var("TOPIC_GRAPH_TEST_ENV_OR_NUM", " 42 ");
        std::env::set_var("TOPIC_GRAPH_TEST_ENV_OR_BAD", "lots");

        assert_eq!(env_or("TOPIC_GRAPH_TEST_ENV_OR_NUM", 7usize), 42);
        assert_eq!(env_or("TOPIC_GRAPH_TEST_ENV_OR_BAD", 7usize), 7);
        assert!(!env_or("TOPIC_GRAPH_TEST_ENV_OR_UNSET", false));

        std::env::remove_var("TOPIC_GRAPH_TEST_ENV_OR_NUM");
        std::env::remove_var("TOPIC_GRAPH_TEST_ENV_OR_BAD");
    }
}
