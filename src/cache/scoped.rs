//! Per-scope cache that deduplicates concurrent loads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use super::{
    LoadFuture,
    TranslationCache,
};
use crate::storage::{
    StorageError,
    TranslationMap,
};

/// ロケールごとの初期化セル
type Slot = Arc<OnceCell<Arc<TranslationMap>>>;

/// Unbounded cache meant to live for one unit of work.
///
/// Concurrent [`TranslationCache::get_or_load`] calls for the same locale run one load and
/// all receive the same `Arc`. A failed load leaves the locale empty so the next call retries.
#[derive(Default)]
pub struct ScopedCache {
    /// ロケール → 初期化セル
    slots: Mutex<HashMap<String, Slot>>,
}

impl ScopedCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期化済みの値を取得
    fn loaded(&self, locale: &str) -> Option<Arc<TranslationMap>> {
        self.slots.lock().get(locale).and_then(|slot| slot.get().cloned())
    }

    /// ロケールのセルを取得、なければ作成
    fn slot(&self, locale: &str) -> Slot {
        Arc::clone(self.slots.lock().entry(locale.to_string()).or_default())
    }
}

impl fmt::Debug for ScopedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("ScopedCache")
            .field("locales", &slots.iter().filter(|(_, slot)| slot.initialized()).count())
            .field("slots", &slots.len())
            .finish()
    }
}

#[async_trait]
impl TranslationCache for ScopedCache {
    async fn get(&self, locale: &str) -> Option<Arc<TranslationMap>> {
        self.loaded(locale)
    }

    async fn set(&self, locale: &str, translations: Arc<TranslationMap>) {
        let slot = Arc::new(OnceCell::new_with(Some(translations)));
        self.slots.lock().insert(locale.to_string(), slot);
    }

    async fn has(&self, locale: &str) -> bool {
        self.loaded(locale).is_some()
    }

    async fn invalidate(&self, locale: &str) {
        self.slots.lock().remove(locale);
    }

    async fn clear(&self) {
        self.slots.lock().clear();
    }

    async fn get_or_load(
        &self,
        locale: &str,
        loader: LoadFuture<'_>,
    ) -> Result<Arc<TranslationMap>, StorageError> {
        let slot = self.slot(locale);
        let translations = slot
            .get_or_try_init(|| async move {
                tracing::debug!(locale, "Loading translations for scope");
                loader.await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(translations))
    }
}
