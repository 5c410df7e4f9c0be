//! 設定ファイルの探索と読み込み

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    RuntimeSettings,
};

/// 設定ファイル名
pub const CONFIG_FILE_NAME: &str = ".i18n-runtime.json";

/// `start` から親ディレクトリへ向かって設定ファイルを探す
///
/// 最初に見つかったファイルを返す。
pub(super) fn find_config_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|path| path.is_file())
}

/// 設定ファイルを読み込む
///
/// 記述されていない項目はデフォルト値になる。
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON パースエラー
pub(super) fn load_from_path(config_path: &Path) -> Result<RuntimeSettings, ConfigError> {
    tracing::debug!(path = %config_path.display(), "Loading configuration");

    let content = std::fs::read_to_string(config_path)?;
    Ok(serde_json::from_str(&content)?)
}

/// `start` 以上のディレクトリにある設定を読み込む
///
/// # Returns
/// - `Ok(Some((path, settings)))`: 設定ファイルが見つかった
/// - `Ok(None)`: どの親ディレクトリにも設定ファイルがない
///
/// # Errors
/// 見つかったファイルの読み込みまたはパースに失敗した場合
pub(super) fn discover(start: &Path) -> Result<Option<(PathBuf, RuntimeSettings)>, ConfigError> {
    let Some(config_path) = find_config_file(start) else {
        tracing::debug!(start = %start.display(), "No configuration file found");
        return Ok(None);
    };
    let settings = load_from_path(&config_path)?;
    Ok(Some((config_path, settings)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use tempfile::TempDir;

    use super::*;

    #[googletest::test]
    fn partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, r#"{"defaultLocale": "de", "cache": {"ttlSecs": 60}}"#).unwrap();

        let settings = load_from_path(&config_path).unwrap();

        expect_that!(settings.default_locale, eq("de"));
        expect_that!(settings.cache.ttl_secs, eq(60));
        expect_that!(settings.cache.capacity, eq(100));
        expect_that!(settings.storage.translations_dir, eq("locales"));
    }

    #[googletest::test]
    fn finds_file_in_ancestor_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("services").join("web");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"defaultLocale": "fr"}"#).unwrap();

        let (path, settings) = discover(&nested).unwrap().unwrap();

        expect_that!(path, eq(&temp_dir.path().join(CONFIG_FILE_NAME)));
        expect_that!(settings.default_locale, eq("fr"));
    }

    #[googletest::test]
    fn nearest_file_wins() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("app");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"defaultLocale": "fr"}"#).unwrap();
        fs::write(nested.join(CONFIG_FILE_NAME), r#"{"defaultLocale": "ja"}"#).unwrap();

        let (path, settings) = discover(&nested).unwrap().unwrap();

        expect_that!(path, eq(&nested.join(CONFIG_FILE_NAME)));
        expect_that!(settings.default_locale, eq("ja"));
    }

    #[googletest::test]
    fn directory_named_like_config_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(CONFIG_FILE_NAME)).unwrap();

        expect_that!(find_config_file(temp_dir.path()), none());
    }

    #[googletest::test]
    fn invalid_json_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "invalid json").unwrap();

        let result = discover(temp_dir.path());

        expect_that!(matches!(result, Err(ConfigError::ParseError(_))), eq(true));
    }
}
