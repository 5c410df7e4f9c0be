use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::validation::{
    ValidationError,
    is_locale_code,
};

/// Plural rule cache capacity for long-lived server processes.
pub const SERVER_PLURAL_CACHE_CAPACITY: usize = 50;

/// Plural rule cache capacity for short-lived, memory-constrained clients.
pub const CLIENT_PLURAL_CACHE_CAPACITY: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// 検証エラーを 1 行ずつに整形
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    /// Locale that source strings are written in.
    pub default_locale: String,

    /// Locales the deployment serves.
    ///
    /// - `None`: any well-formed requested locale is used as-is (default)
    /// - `Some([...])`: requested locales are negotiated against this list
    pub supported_locales: Option<Vec<String>>,

    pub limits: LimitsConfig,
    pub plural_cache: PluralCacheConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitsConfig {
    /// Max source text size accepted at ingestion, in bytes.
    pub max_source_text_length: usize,
    /// Max pattern length accepted by the formatter, in characters.
    /// Longer patterns are truncated before parsing.
    pub max_pattern_length: usize,
    pub max_context_length: usize,
    pub max_hash_length: usize,
    pub max_locale_length: usize,
    pub max_batch_size: usize,
    pub max_nesting_depth: usize,
    /// Block resolution steps allowed per `format` call.
    pub max_iterations: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_source_text_length: 10 * 1024,
            max_pattern_length: 50_000,
            max_context_length: 100,
            max_hash_length: 16,
            max_locale_length: 35,
            max_batch_size: 1000,
            max_nesting_depth: 5,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PluralCacheConfig {
    pub capacity: usize,
}

impl Default for PluralCacheConfig {
    fn default() -> Self {
        Self { capacity: SERVER_PLURAL_CACHE_CAPACITY }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Max number of locales kept by the in-process LRU cache.
    pub capacity: usize,
    pub ttl_secs: u64,
    /// Prefix for keys written to an external backing store.
    pub key_prefix: String,
    /// Per-call timeout for backing store operations.
    pub backend_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl_secs: 300,
            key_prefix: "i18n:translations:".to_string(),
            backend_timeout_ms: 250,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Directory holding one `<locale>.json` file per locale.
    pub translations_dir: String,
    pub load_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { translations_dir: "locales".to_string(), load_timeout_ms: 5000 }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            supported_locales: None,
            limits: LimitsConfig::default(),
            plural_cache: PluralCacheConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RuntimeSettings {
    /// # Errors
    /// - Invalid locale code
    /// - Zero limit or capacity
    /// - Empty key prefix or translations directory
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !is_locale_code(&self.default_locale) {
            errors.push(ValidationError::new(
                "defaultLocale",
                format!(
                    "'{}' is not a valid locale code. Example: \"en\", \"pt-BR\"",
                    self.default_locale
                ),
            ));
        }

        if let Some(supported) = &self.supported_locales {
            if supported.is_empty() {
                errors.push(ValidationError::new(
                    "supportedLocales",
                    "At least one locale is required, or remove this field",
                ));
            }
            for (index, locale) in supported.iter().enumerate() {
                if !is_locale_code(locale) {
                    errors.push(ValidationError::new(
                        format!("supportedLocales[{index}]"),
                        format!("'{locale}' is not a valid locale code"),
                    ));
                }
            }
        }

        let limits = [
            ("limits.maxSourceTextLength", self.limits.max_source_text_length),
            ("limits.maxPatternLength", self.limits.max_pattern_length),
            ("limits.maxContextLength", self.limits.max_context_length),
            ("limits.maxHashLength", self.limits.max_hash_length),
            ("limits.maxLocaleLength", self.limits.max_locale_length),
            ("limits.maxBatchSize", self.limits.max_batch_size),
            ("limits.maxNestingDepth", self.limits.max_nesting_depth),
            ("limits.maxIterations", self.limits.max_iterations),
            ("pluralCache.capacity", self.plural_cache.capacity),
            ("cache.capacity", self.cache.capacity),
        ];
        for (field_path, value) in limits {
            if value == 0 {
                errors.push(ValidationError::new(field_path, "The value must be greater than 0"));
            }
        }

        if self.limits.max_hash_length < crate::hash::KEY_LENGTH {
            errors.push(ValidationError::new(
                "limits.maxHashLength",
                format!("The value must be at least {}", crate::hash::KEY_LENGTH),
            ));
        }

        if self.cache.key_prefix.is_empty() {
            errors.push(ValidationError::new(
                "cache.keyPrefix",
                "The prefix cannot be empty. Example: \"i18n:translations:\"",
            ));
        }

        if self.storage.translations_dir.is_empty() {
            errors.push(ValidationError::new(
                "storage.translationsDir",
                "The directory cannot be empty. Example: \"locales\"",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
