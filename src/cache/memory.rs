//! Bounded in-process LRU cache with TTL.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{
    Duration,
    Instant,
};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use super::TranslationCache;
use crate::config::CacheConfig;
use crate::storage::TranslationMap;

/// キャッシュエントリ
struct CacheEntry {
    /// ロケールの翻訳マップ
    translations: Arc<TranslationMap>,
    /// 期限切れになる時刻 (`None` は無期限)
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// 期限切れかどうか
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// LRU cache of translation maps, shared across scopes.
///
/// `get` refreshes recency; inserting a new locale at capacity evicts the least recently used
/// one. Expired entries are dropped lazily when touched.
pub struct MemoryCache {
    /// LRU 本体
    entries: Mutex<LruCache<String, CacheEntry>>,
    /// エントリの有効期間
    ttl: Duration,
}

impl MemoryCache {
    /// Creates a cache of at most `capacity` locales (at least one). A zero `ttl` disables
    /// caching: every entry is expired as soon as it is written.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(capacity)), ttl }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns true if `locale` is stored, without touching recency or expiry.
    #[must_use]
    pub fn contains(&self, locale: &str) -> bool {
        self.entries.lock().contains(locale)
    }

    /// 期限内のエントリを取得し、期限切れなら削除
    fn lookup(&self, locale: &str) -> Option<Arc<TranslationMap>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        match entries.get(locale) {
            Some(entry) if !entry.is_expired(now) => Some(Arc::clone(&entry.translations)),
            Some(_) => {
                tracing::debug!(locale, "Cached translations expired");
                entries.pop(locale);
                None
            }
            None => None,
        }
    }

    /// エントリを挿入
    fn store(&self, locale: &str, translations: Arc<TranslationMap>) {
        let expires_at = Instant::now().checked_add(self.ttl);
        let evicted = self
            .entries
            .lock()
            .push(locale.to_string(), CacheEntry { translations, expires_at })
            .filter(|(evicted, _)| evicted != locale);
        if let Some((evicted, _)) = evicted {
            tracing::debug!(locale = %evicted, "Evicted least recently used translations");
        }
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("MemoryCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[async_trait]
impl TranslationCache for MemoryCache {
    async fn get(&self, locale: &str) -> Option<Arc<TranslationMap>> {
        self.lookup(locale)
    }

    async fn set(&self, locale: &str, translations: Arc<TranslationMap>) {
        self.store(locale, translations);
    }

    async fn has(&self, locale: &str) -> bool {
        self.entries.lock().peek(locale).is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    async fn invalidate(&self, locale: &str) {
        self.entries.lock().pop(locale);
    }

    async fn clear(&self) {
        self.entries.lock().clear();
    }
}
