//! Key/value cache backends.

mod memory;
mod redis;

pub use memory::InMemoryCache;
pub use self::redis::RedisCache;

use std::sync::Arc;

use tracing::info;

use crate::application::cache::KvCache;
use crate::config::CacheSettings;
use crate::infra::error::InfraError;

/// Connect the configured backend: Redis when a URL is set, otherwise a
/// process-local map.
pub async fn connect_backend(settings: &CacheSettings) -> Result<Arc<dyn KvCache>, InfraError> {
    match settings.redis_url.as_deref() {
        Some(url) => {
            let cache = RedisCache::connect(url)
                .await
                .map_err(|err| InfraError::cache(err.to_string()))?;
            cache
                .ping()
                .await
                .map_err(|err| InfraError::cache(err.to_string()))?;
            info!(target = "blog::cache", backend = "redis", "entity cache connected");
            Ok(Arc::new(cache))
        }
        None => {
            info!(
                target = "blog::cache",
                backend = "memory",
                "no redis url configured, using in-process entity cache"
            );
            Ok(Arc::new(InMemoryCache::new()))
        }
    }
}
