//! CLDR plural categories with a bounded cache of per-locale rule sets.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use fixed_decimal::Decimal;
use icu_locale_core::Locale;
use icu_plurals::provider::{
    Baked,
    PluralsCardinalV1,
};
use icu_plurals::{
    PluralCategory as IcuCategory,
    PluralOperands,
    PluralRuleType,
    PluralRules,
};
use icu_provider::{
    DataIdentifierBorrowed,
    DataLocale,
    DataProvider,
    DataRequest,
    DataResponse,
};
use lru::LruCache;
use parking_lot::Mutex;

use super::value::Value;

/// Locale whose rules apply when a locale code cannot be parsed or has no rules.
pub const DEFAULT_PLURAL_LOCALE: &str = "en";

/// CLDR plural category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    /// Selector keyword used in plural blocks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }

    /// English cardinal rule: `one` for exactly 1, otherwise `other`.
    #[must_use]
    pub fn english(value: &Value) -> Self {
        if value.as_integer() == Some(1) { Self::One } else { Self::Other }
    }
}

impl From<IcuCategory> for PluralCategory {
    fn from(category: IcuCategory) -> Self {
        match category {
            IcuCategory::Zero => Self::Zero,
            IcuCategory::One => Self::One,
            IcuCategory::Two => Self::Two,
            IcuCategory::Few => Self::Few,
            IcuCategory::Many => Self::Many,
            IcuCategory::Other => Self::Other,
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the plural category of a numeric value in a locale.
pub trait PluralCategoryProvider: Send + Sync {
    fn category(&self, value: &Value, locale: &str) -> PluralCategory;
}

/// Bounded LRU cache from locale code to constructed plural rules.
///
/// Shared across scopes; lookups and inserts are serialized by an internal mutex, rule
/// construction happens outside it.
pub struct PluralRuleCache {
    /// ロケール → ルール
    rules: Mutex<LruCache<String, Arc<PluralRules>>>,
    /// ルールのないロケールに使うロケール
    fallback_locale: String,
}

impl PluralRuleCache {
    /// Creates a cache holding at most `capacity` rule sets (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_fallback_locale(capacity, DEFAULT_PLURAL_LOCALE)
    }

    #[must_use]
    pub fn with_fallback_locale(capacity: usize, fallback_locale: impl Into<String>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { rules: Mutex::new(LruCache::new(capacity)), fallback_locale: fallback_locale.into() }
    }

    /// Returns the cached rules for `locale`, constructing them on a miss.
    ///
    /// `None` only if neither `locale` nor the fallback locale has rules.
    pub fn rules_for(&self, locale: &str) -> Option<Arc<PluralRules>> {
        if let Some(rules) = self.rules.lock().get(locale) {
            return Some(Arc::clone(rules));
        }

        let rules = build_rules(locale).or_else(|| {
            tracing::debug!(locale, fallback = %self.fallback_locale, "No plural rules for locale");
            build_rules(&self.fallback_locale)
        })?;
        let rules = Arc::new(rules);
        self.rules.lock().put(locale.to_string(), Arc::clone(&rules));
        Some(rules)
    }

    /// Returns true if rules for `locale` are cached, without touching recency.
    #[must_use]
    pub fn contains(&self, locale: &str) -> bool {
        self.rules.lock().contains(locale)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.rules.lock().cap().get()
    }

    pub fn clear(&self) {
        self.rules.lock().clear();
    }
}

impl PluralCategoryProvider for PluralRuleCache {
    fn category(&self, value: &Value, locale: &str) -> PluralCategory {
        let Some(rules) = self.rules_for(locale) else {
            return PluralCategory::english(value);
        };
        operands(value).map_or(PluralCategory::Other, |ops| rules.category_for(ops).into())
    }
}

impl fmt::Debug for PluralRuleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluralRuleCache")
            .field("rules", &"<LruCache<String, PluralRules>>")
            .field("len", &self.len())
            .field("fallback_locale", &self.fallback_locale)
            .finish()
    }
}

/// Returns the plural category of `value` in `locale`, using `cache` for rule lookup.
pub fn get_category(value: &Value, locale: &str, cache: &PluralRuleCache) -> PluralCategory {
    cache.category(value, locale)
}

/// ロケールの基数ルールを構築
///
/// データにないロケールは ICU が root (`und`) のルールで補うため、それを検出して `None` を返す。
fn build_rules(locale: &str) -> Option<PluralRules> {
    let parsed: Locale = locale.parse().ok()?;
    if resolves_to_root(&parsed) {
        tracing::debug!(locale, "Only root plural rules available");
        return None;
    }
    PluralRules::try_new(parsed.into(), PluralRuleType::Cardinal.into())
        .map_err(|e| tracing::debug!(locale, "Failed to load plural rules: {e:?}"))
        .ok()
}

/// 基数ルールの読み込みが root までフォールバックするか
fn resolves_to_root(locale: &Locale) -> bool {
    let data_locale = DataLocale::from(locale);
    let request =
        DataRequest { id: DataIdentifierBorrowed::for_locale(&data_locale), ..Default::default() };
    let response: Result<DataResponse<PluralsCardinalV1>, _> =
        DataProvider::<PluralsCardinalV1>::load(&Baked, request);
    match response {
        Ok(response) => response.metadata.locale.as_ref().is_some_and(DataLocale::is_unknown),
        Err(_) => true,
    }
}

/// Integers map directly; decimals go through their string form so `1.50` keeps its
/// visible fraction digits.
fn operands(value: &Value) -> Option<PluralOperands> {
    match value.to_numeric()? {
        Value::Integer(n) => Some(PluralOperands::from(n)),
        Value::Decimal(n) => {
            let decimal = match value {
                Value::Text(text) => Decimal::try_from_str(text.trim()).ok(),
                _ => None,
            }
            .or_else(|| Decimal::try_from_str(&n.to_string()).ok())?;
            Some(PluralOperands::from(&decimal))
        }
        Value::Text(_) => None,
    }
}
