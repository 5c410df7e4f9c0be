//! Per-locale translation map caches.
//!
//! All caches share the [`TranslationCache`] contract:
//! - [`MemoryCache`]: bounded LRU with per-entry TTL, shared across scopes
//! - [`ExternalCache`]: best-effort cache over a [`CacheBackingStore`] such as Redis
//! - [`ScopedCache`]: unbounded, one instance per unit of work, deduplicates in-flight loads

mod backing;
mod external;
mod memory;
mod scoped;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

pub use backing::{
    CacheBackendError,
    CacheBackingStore,
    InMemoryBackingStore,
};
pub use external::ExternalCache;
pub use memory::MemoryCache;
pub use scoped::ScopedCache;

use crate::storage::{
    StorageError,
    TranslationMap,
};

/// A pending translation load, run only on a cache miss.
pub type LoadFuture<'a> = BoxFuture<'a, Result<TranslationMap, StorageError>>;

/// Cache of translation maps keyed by locale code.
///
/// Cache failures never surface here: a broken backend behaves like an empty cache.
#[async_trait]
pub trait TranslationCache: Send + Sync {
    async fn get(&self, locale: &str) -> Option<Arc<TranslationMap>>;

    async fn set(&self, locale: &str, translations: Arc<TranslationMap>);

    async fn has(&self, locale: &str) -> bool;

    async fn invalidate(&self, locale: &str);

    async fn clear(&self);

    /// Returns the cached map for `locale`, running `loader` and caching its result on a miss.
    ///
    /// Load failures are returned and nothing is cached.
    async fn get_or_load(
        &self,
        locale: &str,
        loader: LoadFuture<'_>,
    ) -> Result<Arc<TranslationMap>, StorageError> {
        if let Some(cached) = self.get(locale).await {
            tracing::debug!(locale, "Translation cache hit");
            return Ok(cached);
        }

        tracing::debug!(locale, "Translation cache miss");
        let loaded = Arc::new(loader.await?);
        self.set(locale, Arc::clone(&loaded)).await;
        Ok(loaded)
    }
}
