//! Durable key-value storage backing wizard snapshots.
//!
//! `MemoryStore` is the default; `RedisStore` is used when `REDIS_URL` is set.

pub mod memory;
pub mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Storage quota exceeded: {used} of {limit} bytes")]
    QuotaExceeded { used: usize, limit: usize },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>)
        -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Builds a namespaced key: `{namespace}:{scope}:{key}`.
///
/// `scope` plays the role of a browser origin (one visitor); `key` is the
/// flow's fixed storage key.
pub fn storage_key(namespace: &str, scope: &str, key: &str) -> String {
    format!("{namespace}:{scope}:{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_layout() {
        assert_eq!(
            storage_key("funnel", "v1", "career-os-application"),
            "funnel:v1:career-os-application"
        );
    }
}
