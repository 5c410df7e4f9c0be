//! Per-unit-of-work translation context.
//!
//! A [`TranslationScope`] is created once per request with its translations already merged.
//! Lookups never touch storage or caches, so a scope can be shared freely across tasks.
//!
//! Code that cannot thread the scope explicitly can install it for the duration of a future with
//! [`TranslationScope::enter`] and call [`t`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::config::{
    CLIENT_PLURAL_CACHE_CAPACITY,
    LimitsConfig,
};
use crate::format::{
    DEFAULT_PLURAL_LOCALE,
    FormatOptions,
    Params,
    PluralRuleCache,
    Value,
    format,
};
use crate::hash::derive_key;
use crate::storage::{
    StorageAdapter,
    TranslationMap,
};
use crate::validation::{
    ValidationError,
    validate_batch_size,
};

tokio::task_local! {
    /// `enter` で設定された現在のスコープ
    static CURRENT_SCOPE: Arc<TranslationScope>;
}

/// Disambiguation context and interpolation parameters for one lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupOptions {
    pub context: Option<String>,
    pub params: Params,
}

impl LookupOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self { context: None, params }
    }

    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Resolved locale, fallback chain and merged translations for one unit of work.
///
/// Immutable once built.
pub struct TranslationScope {
    /// 解決済みロケール
    locale: String,
    /// ソース文字列の言語
    default_locale: String,
    /// フォールバックチェーン（具体的なものから順）
    chain: Vec<String>,
    /// チェーンをマージした翻訳
    translations: Arc<TranslationMap>,
    /// 入力制限
    limits: LimitsConfig,
    /// 共有の複数形ルールキャッシュ
    plural_rules: Arc<PluralRuleCache>,
    /// 翻訳の取得元
    storage: Option<Arc<dyn StorageAdapter>>,
}

impl TranslationScope {
    /// Creates a scope with default limits and its own plural rule cache.
    #[must_use]
    pub fn new(
        locale: impl Into<String>,
        default_locale: impl Into<String>,
        chain: Vec<String>,
        translations: Arc<TranslationMap>,
    ) -> Self {
        Self {
            locale: locale.into(),
            default_locale: default_locale.into(),
            chain,
            translations,
            limits: LimitsConfig::default(),
            plural_rules: Arc::new(PluralRuleCache::new(CLIENT_PLURAL_CACHE_CAPACITY)),
            storage: None,
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Shares `plural_rules` with other scopes.
    #[must_use]
    pub fn with_plural_rules(mut self, plural_rules: Arc<PluralRuleCache>) -> Self {
        self.plural_rules = plural_rules;
        self
    }

    /// Records the storage the translations came from.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Most specific first, always ending with the default locale.
    #[must_use]
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    #[must_use]
    pub fn translations(&self) -> &TranslationMap {
        &self.translations
    }

    #[must_use]
    pub fn storage(&self) -> Option<&Arc<dyn StorageAdapter>> {
        self.storage.as_ref()
    }

    /// Source strings are already in the default locale, so such scopes never consult the map.
    #[must_use]
    pub fn is_default_locale(&self) -> bool {
        self.locale == self.default_locale
    }

    /// Resolves `text` to the scope's locale and formats it.
    ///
    /// Untranslated text falls back to the source text. Never fails.
    #[must_use]
    pub fn lookup(&self, text: &str, options: &LookupOptions) -> String {
        let pattern = if self.is_default_locale() {
            text
        } else {
            let key = derive_key(text, options.context.as_deref());
            self.translations.get(&key).map_or(text, String::as_str)
        };
        format(pattern, &options.params, &self.format_options())
    }

    /// Resolves every `(text, options)` pair in order.
    ///
    /// # Errors
    /// Returns an error if there are more items than `maxBatchSize`.
    pub fn lookup_batch(
        &self,
        items: &[(String, LookupOptions)],
    ) -> Result<Vec<String>, ValidationError> {
        validate_batch_size(items.len(), &self.limits)?;
        Ok(items.iter().map(|(text, options)| self.lookup(text, options)).collect())
    }

    /// Runs `future` with this scope installed for [`t`] and [`TranslationScope::current`].
    pub async fn enter<F>(self: Arc<Self>, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_SCOPE.scope(self, future).await
    }

    /// Synchronous counterpart of [`TranslationScope::enter`].
    pub fn enter_sync<R>(self: Arc<Self>, f: impl FnOnce() -> R) -> R {
        CURRENT_SCOPE.sync_scope(self, f)
    }

    /// The scope installed by the innermost `enter`, if any.
    #[must_use]
    pub fn current() -> Option<Arc<Self>> {
        CURRENT_SCOPE.try_with(Arc::clone).ok()
    }

    /// フォーマットオプションを組み立てる
    fn format_options(&self) -> FormatOptions<'_> {
        FormatOptions::new(&self.locale)
            .with_limits(&self.limits)
            .with_plural_rules(self.plural_rules.as_ref())
    }
}

impl fmt::Debug for TranslationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationScope")
            .field("locale", &self.locale)
            .field("default_locale", &self.default_locale)
            .field("chain", &self.chain)
            .field("translations", &self.translations.len())
            .field("limits", &self.limits)
            .field("plural_rules", &self.plural_rules)
            .field("storage", &self.storage.as_ref().map(|_| "<StorageAdapter>"))
            .finish()
    }
}

/// Looks `text` up in the current scope.
///
/// Outside any scope the source text is formatted as-is with English plural rules, as a
/// default-locale scope would.
#[must_use]
pub fn t(text: &str, options: &LookupOptions) -> String {
    CURRENT_SCOPE.try_with(|scope| scope.lookup(text, options)).unwrap_or_else(|_| {
        format(text, &options.params, &FormatOptions::new(DEFAULT_PLURAL_LOCALE))
    })
}
