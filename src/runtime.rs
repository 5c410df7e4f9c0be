//! Scope factory wiring storage, caches and plural rules together.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::try_join_all;
use thiserror::Error;

use crate::cache::{
    MemoryCache,
    TranslationCache,
};
use crate::config::RuntimeSettings;
use crate::format::PluralRuleCache;
use crate::locale::{
    negotiate_locale,
    resolve_locale_chain,
};
use crate::scope::TranslationScope;
use crate::storage::{
    StorageAdapter,
    StorageError,
    TranslationMap,
};
use crate::validation::{
    ValidationError,
    validate_locale,
};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Creates [`TranslationScope`]s.
///
/// One runtime is shared by the whole process: its translation cache and plural rule cache
/// outlive every scope it creates.
pub struct TranslationRuntime {
    /// 設定
    settings: RuntimeSettings,
    /// 翻訳の取得元
    storage: Arc<dyn StorageAdapter>,
    /// ロケールごとの翻訳キャッシュ
    cache: Arc<dyn TranslationCache>,
    /// 全スコープで共有する複数形ルール
    plural_rules: Arc<PluralRuleCache>,
}

impl TranslationRuntime {
    /// Creates a runtime caching translations in a [`MemoryCache`] sized by `settings.cache`.
    #[must_use]
    pub fn new(settings: RuntimeSettings, storage: Arc<dyn StorageAdapter>) -> Self {
        let cache = Arc::new(MemoryCache::from_config(&settings.cache));
        let plural_rules = Arc::new(PluralRuleCache::new(settings.plural_cache.capacity));
        Self { settings, storage, cache, plural_rules }
    }

    /// Replaces the translation cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<dyn TranslationCache> {
        &self.cache
    }

    #[must_use]
    pub const fn plural_rules(&self) -> &Arc<PluralRuleCache> {
        &self.plural_rules
    }

    /// Builds the scope for a requested locale.
    ///
    /// The locale is validated, negotiated against `supportedLocales` and expanded into its
    /// fallback chain. Each chain locale is loaded through the cache and the maps are merged so
    /// more specific locales win. A default-locale scope loads nothing.
    ///
    /// # Errors
    /// - Malformed or oversized locale code
    /// - Storage failure other than a timeout
    pub async fn create_scope(&self, requested: &str) -> Result<TranslationScope, RuntimeError> {
        let limits = &self.settings.limits;
        validate_locale(requested, limits)?;

        let default_locale = &self.settings.default_locale;
        let locale =
            negotiate_locale(requested, self.settings.supported_locales.as_deref(), default_locale);
        let chain = resolve_locale_chain(&locale, default_locale);

        let translations = if locale == *default_locale {
            Arc::new(TranslationMap::new())
        } else {
            self.load_chain(&chain).await?
        };

        tracing::debug!(
            requested,
            locale = %locale,
            ?chain,
            translations = translations.len(),
            "Created translation scope"
        );

        Ok(TranslationScope::new(locale, default_locale.clone(), chain, translations)
            .with_limits(*limits)
            .with_plural_rules(Arc::clone(&self.plural_rules))
            .with_storage(Arc::clone(&self.storage)))
    }

    /// Loads one locale's translations through the cache.
    ///
    /// A load that exceeds `storage.loadTimeoutMs` yields an empty map, which is not cached.
    ///
    /// # Errors
    /// Storage failures other than a timeout.
    pub async fn load_locale(&self, locale: &str) -> Result<Arc<TranslationMap>, StorageError> {
        let timeout = self.settings.storage.load_timeout();
        let loader = async move {
            tokio::time::timeout(timeout, self.storage.get_translations(locale)).await.unwrap_or_else(
                |_| Err(StorageError::Timeout { locale: locale.to_string(), timeout }),
            )
        }
        .boxed();

        match self.cache.get_or_load(locale, loader).await {
            Err(error @ StorageError::Timeout { .. }) => {
                tracing::warn!(locale, %error, "Serving locale without translations");
                Ok(Arc::new(TranslationMap::new()))
            }
            result => result,
        }
    }

    pub async fn invalidate(&self, locale: &str) {
        self.cache.invalidate(locale).await;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// チェーンを読み込み、一般的なものから順にマージする
    async fn load_chain(&self, chain: &[String]) -> Result<Arc<TranslationMap>, StorageError> {
        let maps = try_join_all(chain.iter().rev().map(|locale| self.load_locale(locale))).await?;
        if let [only] = maps.as_slice() {
            return Ok(Arc::clone(only));
        }

        let mut merged = TranslationMap::new();
        for map in &maps {
            merged.extend(map.iter().map(|(key, text)| (key.clone(), text.clone())));
        }
        Ok(Arc::new(merged))
    }
}

impl fmt::Debug for TranslationRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationRuntime")
            .field("settings", &self.settings)
            .field("storage", &"<StorageAdapter>")
            .field("cache", &"<TranslationCache>")
            .field("plural_rules", &self.plural_rules)
            .finish()
    }
}
