//! Best-effort cache over an external key-value store.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    CacheBackendError,
    CacheBackingStore,
    TranslationCache,
};
use crate::config::CacheConfig;
use crate::storage::TranslationMap;

/// Stores each locale's map as JSON under `<key_prefix><locale>`.
///
/// Every backing store call runs under a timeout. Failures and timeouts are logged and treated
/// as a miss (`get`), a no-op (`set`, `invalidate`, `clear`) or `false` (`has`).
pub struct ExternalCache {
    /// 外部ストア
    store: Arc<dyn CacheBackingStore>,
    /// キーの接頭辞
    key_prefix: String,
    /// 書き込む値の有効期間
    ttl: Duration,
    /// 1 回の呼び出しのタイムアウト
    timeout: Duration,
}

impl ExternalCache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheBackingStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            ttl: config.ttl(),
            timeout: config.backend_timeout(),
        }
    }

    /// ロケールのストアキー
    fn store_key(&self, locale: &str) -> String {
        format!("{}{locale}", self.key_prefix)
    }

    /// Runs one store call under the timeout. `None` means the call failed and was logged.
    async fn call<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = Result<T, CacheBackendError>> + Send,
    ) -> Option<T> {
        let error = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(error)) => error,
            Err(_) => CacheBackendError::Timeout(self.timeout),
        };
        tracing::warn!(operation, %error, "Translation cache backend call failed");
        None
    }
}

impl fmt::Debug for ExternalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalCache")
            .field("store", &"<CacheBackingStore>")
            .field("key_prefix", &self.key_prefix)
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl TranslationCache for ExternalCache {
    async fn get(&self, locale: &str) -> Option<Arc<TranslationMap>> {
        let key = self.store_key(locale);
        let raw = self.call("get", self.store.get(&key)).await.flatten()?;

        match serde_json::from_str::<TranslationMap>(&raw) {
            Ok(translations) => Some(Arc::new(translations)),
            Err(e) => {
                let error = CacheBackendError::InvalidValue(e.to_string());
                tracing::warn!(locale, %error, "Ignoring cached translations");
                None
            }
        }
    }

    async fn set(&self, locale: &str, translations: Arc<TranslationMap>) {
        let value = match serde_json::to_string(translations.as_ref()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(locale, "Failed to serialize translations: {e}");
                return;
            }
        };
        let key = self.store_key(locale);
        self.call("set", self.store.set(&key, value, Some(self.ttl))).await;
    }

    async fn has(&self, locale: &str) -> bool {
        let key = self.store_key(locale);
        self.call("get", self.store.get(&key)).await.flatten().is_some()
    }

    async fn invalidate(&self, locale: &str) {
        let keys = [self.store_key(locale)];
        self.call("del", self.store.del(&keys)).await;
    }

    async fn clear(&self) {
        let pattern = format!("{}*", self.key_prefix);
        let Some(keys) = self.call("keys", self.store.keys(&pattern)).await else {
            return;
        };
        if keys.is_empty() {
            return;
        }
        tracing::debug!(count = keys.len(), "Clearing cached translations");
        self.call("del", self.store.del(&keys)).await;
    }
}
