//! Key/value cache port and the typed entity cache built on top of it.
//!
//! The cache is advisory: the store stays authoritative for existence, and
//! every write through [`EntityCache`] is best-effort from the caller's
//! point of view. Keys follow `{entity}:{id}` (or `{entity}:{natural key}`)
//! and every entry lives for [`ENTITY_TTL`].

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::domain::entities::{PostId, UserId};

/// Lifetime of every entity snapshot written to the cache.
pub const ENTITY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("failed to encode `{key}`: {message}")]
    Encode { key: String, message: String },
    #[error("failed to decode `{key}`: {message}")]
    Decode { key: String, message: String },
}

impl CacheError {
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Raw key/value capability with per-key TTL. Absence is `Ok(None)`.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Post(PostId),
    User(UserId),
    UserEmail(String),
}

impl CacheKey {
    pub fn entity(&self) -> &'static str {
        match self {
            CacheKey::Post(_) => "post",
            CacheKey::User(_) | CacheKey::UserEmail(_) => "user",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Post(id) => write!(f, "post:{id}"),
            CacheKey::User(id) => write!(f, "user:{id}"),
            CacheKey::UserEmail(email) => write!(f, "user:{email}"),
        }
    }
}

/// JSON snapshots over a [`KvCache`] backend.
#[derive(Clone)]
pub struct EntityCache {
    backend: Arc<dyn KvCache>,
}

impl EntityCache {
    pub fn new(backend: Arc<dyn KvCache>) -> Self {
        Self { backend }
    }

    pub async fn get_entity<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Result<Option<T>, CacheError> {
        let rendered = key.to_string();
        let Some(raw) = self.backend.get(&rendered).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| CacheError::Decode {
                key: rendered,
                message: err.to_string(),
            })
    }

    pub async fn set_entity<T: Serialize>(
        &self,
        key: &CacheKey,
        entity: &T,
    ) -> Result<(), CacheError> {
        let rendered = key.to_string();
        let encoded = serde_json::to_string(entity).map_err(|err| CacheError::Encode {
            key: rendered.clone(),
            message: err.to_string(),
        })?;
        self.backend.set(&rendered, &encoded, ENTITY_TTL).await
    }

    pub async fn delete_entity(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.backend.delete(&key.to_string()).await
    }
}

pub(crate) fn record_hit(key: &CacheKey) {
    counter!("blog_cache_hit_total", "entity" => key.entity()).increment(1);
}

pub(crate) fn record_miss(key: &CacheKey) {
    counter!("blog_cache_miss_total", "entity" => key.entity()).increment(1);
}

pub(crate) fn record_error(key: &CacheKey, op: &'static str) {
    counter!("blog_cache_error_total", "entity" => key.entity(), "op" => op).increment(1);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde::Deserialize;

    use super::*;

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, (String, Duration)>>,
    }

    #[async_trait]
    impl KvCache for MapCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key)
                .map(|(value, _)| value.clone()))
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: i64,
        label: String,
    }

    #[test]
    fn keys_render_entity_prefix() {
        assert_eq!(CacheKey::Post(12).to_string(), "post:12");
        assert_eq!(CacheKey::User(7).to_string(), "user:7");
        assert_eq!(
            CacheKey::UserEmail("a@example.com".into()).to_string(),
            "user:a@example.com"
        );
        assert_eq!(CacheKey::UserEmail("a@example.com".into()).entity(), "user");
    }

    #[tokio::test]
    async fn entity_roundtrip_uses_fixed_ttl() {
        let backend = Arc::new(MapCache::default());
        let cache = EntityCache::new(backend.clone());
        let key = CacheKey::Post(1);
        let sample = Sample {
            id: 1,
            label: "one".into(),
        };

        cache.set_entity(&key, &sample).await.expect("set");

        let stored: Option<Sample> = cache.get_entity(&key).await.expect("get");
        assert_eq!(stored, Some(sample));
        let ttl = backend.entries.lock().unwrap().get("post:1").map(|(_, ttl)| *ttl);
        assert_eq!(ttl, Some(ENTITY_TTL));

        cache.delete_entity(&key).await.expect("delete");
        let gone: Option<Sample> = cache.get_entity(&key).await.expect("get");
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn undecodable_value_reports_decode_error() {
        let backend = Arc::new(MapCache::default());
        backend
            .set("post:5", "not json", ENTITY_TTL)
            .await
            .expect("seed");
        let cache = EntityCache::new(backend);

        let result: Result<Option<Sample>, _> = cache.get_entity(&CacheKey::Post(5)).await;
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }
}
