//! Key-value stores that [`super::ExternalCache`] writes through to.

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::time::{
    Duration,
    Instant,
};

use async_trait::async_trait;
use globset::Glob;
use thiserror::Error;
use tokio::sync::RwLock;

/// Failure reported by a backing store. Never escapes the cache that uses the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendError {
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    #[error("Backing store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid cached value: {0}")]
    InvalidValue(String),

    #[error("Invalid key pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Backing store does not support listing keys")]
    Unsupported,
}

/// Minimal string key-value store contract (a Redis client fits it).
#[async_trait]
pub trait CacheBackingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError>;

    /// Stores `value`, expiring after `ttl` if the store supports expiry.
    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheBackendError>;

    async fn del(&self, keys: &[String]) -> Result<(), CacheBackendError>;

    /// Lists keys matching a glob `pattern` (`*` matches any run of characters).
    ///
    /// Optional: stores that cannot enumerate keys keep the default.
    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheBackendError> {
        Err(CacheBackendError::Unsupported)
    }
}

/// 保存値
#[derive(Debug)]
struct StoredValue {
    /// 値
    value: String,
    /// 期限切れになる時刻
    expires_at: Option<Instant>,
}

impl StoredValue {
    /// 有効期限内かどうか
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local [`CacheBackingStore`], for tests and single-node deployments.
///
/// Can simulate an outage or a slow backend.
#[derive(Debug, Default)]
pub struct InMemoryBackingStore {
    /// キーと値
    values: RwLock<HashMap<String, StoredValue>>,
    /// true の間、すべての呼び出しが失敗する
    failing: AtomicBool,
    /// 各呼び出しの前に待つ時間
    delay: Option<Duration>,
}

impl InMemoryBackingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// While `failing` is set, every call returns [`CacheBackendError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Raw stored value, ignoring expiry.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).map(|stored| stored.value.clone())
    }

    /// 遅延と障害のシミュレーション
    async fn before_call(&self) -> Result<(), CacheBackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheBackendError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackingStore for InMemoryBackingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        self.before_call().await?;
        let now = Instant::now();
        Ok(self
            .values
            .read()
            .await
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheBackendError> {
        self.before_call().await?;
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.values.write().await.insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheBackendError> {
        self.before_call().await?;
        let mut values = self.values.write().await;
        for key in keys {
            values.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheBackendError> {
        self.before_call().await?;
        let matcher = Glob::new(pattern)
            .map_err(|e| CacheBackendError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        let now = Instant::now();
        let mut keys: Vec<String> = self
            .values
            .read()
            .await
            .iter()
            .filter(|(key, stored)| stored.is_live(now) && matcher.is_match(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
