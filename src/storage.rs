//! Translation storage collaborators.
//!
//! The runtime only reads translations. Where they live is up to the [`StorageAdapter`]
//! implementation: [`JsonDirStorage`] reads one JSON file per locale, [`MemoryStorage`] keeps
//! maps in memory.

use std::collections::HashMap;
use std::fmt;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::time::Duration;

use async_trait::async_trait;
use globset::{
    Glob,
    GlobMatcher,
};
use ignore::WalkBuilder;
use thiserror::Error;

use crate::config::LimitsConfig;
use crate::hash::Key;
use crate::validation::is_locale_code;

/// Translated patterns of one locale, keyed by source key.
pub type TranslationMap = HashMap<Key, String>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{0}' is not a valid locale code")]
    InvalidLocale(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Loading translations for '{locale}' timed out after {timeout:?}")]
    Timeout { locale: String, timeout: Duration },
}

/// Source of per-locale translation maps.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Returns every translation stored for `locale`. A locale without translations yields an
    /// empty map, not an error.
    async fn get_translations(&self, locale: &str) -> Result<TranslationMap, StorageError>;
}

/// Reads `<dir>/<locale>.json` files holding `{ "<key>": "<pattern>" }` objects.
#[derive(Debug, Clone)]
pub struct JsonDirStorage {
    /// Directory holding the locale files
    dir: PathBuf,
    /// Limits used to validate keys read from disk
    limits: LimitsConfig,
}

impl JsonDirStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, limits: LimitsConfig) -> Self {
        Self { dir: dir.into(), limits }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// ロケールファイルのパス
    fn locale_path(&self, locale: &str) -> PathBuf {
        self.dir.join(format!("{locale}.json"))
    }

    /// ディレクトリ内の `<locale>.json` からロケール一覧を取得
    ///
    /// 存在しないディレクトリは空の一覧として扱う。
    pub fn available_locales(&self) -> Result<Vec<String>, StorageError> {
        let matcher = json_file_matcher()?;
        let mut locales = Vec::new();

        for result in WalkBuilder::new(&self.dir)
            .max_depth(Some(1))
            .hidden(true)
            .git_ignore(false)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if !matcher.is_match(path.file_name().map_or(path, Path::new)) {
                continue;
            }
            if let Some(locale) = path.file_stem().and_then(|stem| stem.to_str())
                && is_locale_code(locale)
            {
                locales.push(locale.to_string());
            }
        }

        locales.sort();
        Ok(locales)
    }
}

/// `*.json` にマッチするグロブ
fn json_file_matcher() -> Result<GlobMatcher, StorageError> {
    Glob::new("*.json")
        .map(|glob| glob.compile_matcher())
        .map_err(|e| StorageError::Backend(format!("Invalid locale file pattern: {e}")))
}

#[async_trait]
impl StorageAdapter for JsonDirStorage {
    async fn get_translations(&self, locale: &str) -> Result<TranslationMap, StorageError> {
        // ロケールコードはファイル名になるため、パス区切りなどを含むものは拒否
        if !is_locale_code(locale) {
            return Err(StorageError::InvalidLocale(locale.to_string()));
        }

        let path = self.locale_path(locale);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(locale, path = %path.display(), "No translation file");
                return Ok(TranslationMap::new());
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let raw: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|source| StorageError::Parse { path: path.clone(), source })?;

        let mut translations = TranslationMap::with_capacity(raw.len());
        for (hash, pattern) in raw {
            match Key::parse(&hash, &self.limits) {
                Ok(key) => {
                    translations.insert(key, pattern);
                }
                Err(e) => {
                    tracing::warn!(locale, path = %path.display(), "Skipping translation: {e}");
                }
            }
        }

        tracing::debug!(locale, count = translations.len(), "Loaded translations");
        Ok(translations)
    }
}

/// In-memory storage, mostly useful for tests and embedding.
#[derive(Default)]
pub struct MemoryStorage {
    /// Translations per locale
    locales: HashMap<String, TranslationMap>,
    /// Number of `get_translations` calls served
    loads: AtomicUsize,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the translations of `locale`.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>, translations: TranslationMap) -> Self {
        self.locales.insert(locale.into(), translations);
        self
    }

    /// How many times translations were requested.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("locales", &self.locales.keys().collect::<Vec<_>>())
            .field("loads", &self.loads())
            .finish()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get_translations(&self, locale: &str) -> Result<TranslationMap, StorageError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.locales.get(locale).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::hash::derive_key;

    fn storage_with_files(files: &[(&str, &str)]) -> (TempDir, JsonDirStorage) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).unwrap();
        }
        let storage = JsonDirStorage::new(temp_dir.path(), LimitsConfig::default());
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn reads_locale_file() {
        let hello = derive_key("Hello", None);
        let (_dir, storage) = storage_with_files(&[("fr.json", r#"{"0d462e07": "Bonjour"}"#)]);

        let translations = storage.get_translations("fr").await.unwrap();

        assert_that!(translations.get(&hello), some(eq("Bonjour")));
        assert_that!(translations.len(), eq(1));
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let (_dir, storage) = storage_with_files(&[]);

        let translations = storage.get_translations("de").await.unwrap();

        assert_that!(translations.is_empty(), eq(true));
    }

    #[tokio::test]
    async fn uppercase_keys_are_normalized_and_invalid_keys_skipped() {
        let (_dir, storage) = storage_with_files(&[(
            "fr.json",
            r#"{"0D462E07": "Bonjour", "not-a-key": "x", "": "y"}"#,
        )]);

        let translations = storage.get_translations("fr").await.unwrap();

        assert_that!(translations.get(&derive_key("Hello", None)), some(eq("Bonjour")));
        assert_that!(translations.len(), eq(1));
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let (_dir, storage) = storage_with_files(&[("fr.json", "{ not json")]);

        let result = storage.get_translations("fr").await;

        assert_that!(matches!(result, Err(StorageError::Parse { .. })), eq(true));
    }

    #[tokio::test]
    async fn rejects_path_like_locale() {
        let (_dir, storage) = storage_with_files(&[]);

        let result = storage.get_translations("../secrets").await;

        assert_that!(
            matches!(result, Err(StorageError::InvalidLocale(locale)) if locale == "../secrets"),
            eq(true)
        );
    }

    #[test]
    fn lists_available_locales() {
        let (dir, storage) = storage_with_files(&[
            ("pt-BR.json", "{}"),
            ("en.json", "{}"),
            ("notes.txt", ""),
            ("not a locale.json", "{}"),
        ]);
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("de.json"), "{}").unwrap();

        let locales = storage.available_locales().unwrap();

        assert_that!(locales, elements_are![eq("en"), eq("pt-BR")]);
    }

    #[test]
    fn missing_directory_has_no_locales() {
        let storage = JsonDirStorage::new("/nonexistent/i18n-runtime", LimitsConfig::default());

        assert_that!(storage.available_locales().unwrap(), is_empty());
    }

    #[tokio::test]
    async fn memory_storage_counts_loads() {
        let storage = MemoryStorage::new()
            .with_locale("fr", TranslationMap::from([(derive_key("Hello", None), "Bonjour".into())]));

        let fr = storage.get_translations("fr").await.unwrap();
        let de = storage.get_translations("de").await.unwrap();

        assert_that!(fr.len(), eq(1));
        assert_that!(de.is_empty(), eq(true));
        assert_that!(storage.loads(), eq(2));
    }
}
