//! 設定管理を行うモジュール

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    RuntimeSettings,
    loader,
};

/// 現在の設定と、その読み込み元を保持する
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: RuntimeSettings,

    /// 読み込んだ設定ファイル (デフォルト値の場合は `None`)
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `start_dir` から上へ設定ファイルを探して読み込む
    ///
    /// `start_dir` が `None`、またはファイルが見つからない場合はデフォルト値。
    /// 失敗した場合は現在の設定を維持する。
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, start_dir: Option<&Path>) -> Result<(), ConfigError> {
        let (config_path, settings) = match start_dir.map(loader::discover).transpose()?.flatten() {
            Some((path, settings)) => (Some(path), settings),
            None => (None, RuntimeSettings::default()),
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        tracing::debug!(path = ?config_path, settings = ?settings, "Settings loaded");
        self.current_settings = settings;
        self.config_path = config_path;
        Ok(())
    }

    /// 読み込み元のファイルを読み直す
    ///
    /// 設定が変わった場合は `true`。ファイルから読み込んでいない場合は何もしない。
    ///
    /// # Errors
    /// `load_settings` と同じ
    pub fn reload(&mut self) -> Result<bool, ConfigError> {
        let Some(config_path) = &self.config_path else {
            return Ok(false);
        };
        let settings = loader::load_from_path(config_path)?;
        self.apply(settings)
    }

    /// 設定を更新する
    ///
    /// 既存のスコープには影響しない。新しい設定は次に作成されるランタイムから有効になる。
    /// 設定が変わった場合は `true`。
    ///
    /// # Errors
    /// バリデーションエラー
    pub fn update_settings(&mut self, new_settings: RuntimeSettings) -> Result<bool, ConfigError> {
        self.apply(new_settings)
    }

    #[must_use]
    pub const fn get_settings(&self) -> &RuntimeSettings {
        &self.current_settings
    }

    /// 読み込んだ設定ファイルのパス
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 検証してから差し替える
    fn apply(&mut self, settings: RuntimeSettings) -> Result<bool, ConfigError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        if settings == self.current_settings {
            return Ok(false);
        }
        tracing::info!(
            default_locale = %settings.default_locale,
            supported_locales = ?settings.supported_locales,
            "Settings updated"
        );
        self.current_settings = settings;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::config::CONFIG_FILE_NAME;

    /// 設定ファイルを 1 つ持つディレクトリ
    fn workspace(content: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), content).unwrap();
        temp_dir
    }

    #[rstest]
    fn defaults_without_start_dir() {
        let mut manager = ConfigManager::new();

        manager.load_settings(None).unwrap();

        assert_that!(manager.get_settings(), eq(&RuntimeSettings::default()));
        assert_that!(manager.config_path(), none());
    }

    #[rstest]
    fn loads_config_file() {
        let temp_dir = workspace(r#"{"defaultLocale": "fr", "supportedLocales": ["fr", "de"]}"#);
        let mut manager = ConfigManager::new();

        manager.load_settings(Some(temp_dir.path())).unwrap();

        let settings = manager.get_settings();
        assert_that!(settings.default_locale, eq("fr"));
        assert_that!(settings.supported_locales, some(elements_are![eq("fr"), eq("de")]));
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        assert_that!(manager.config_path(), some(eq(config_path.as_path())));
    }

    #[rstest]
    fn invalid_config_keeps_current() {
        let temp_dir = workspace(r#"{"limits": {"maxIterations": 0}}"#);
        let mut manager = ConfigManager::new();

        let result = manager.load_settings(Some(temp_dir.path()));

        assert_that!(matches!(result, Err(ConfigError::ValidationErrors(_))), eq(true));
        assert_that!(manager.get_settings().limits.max_iterations, eq(100));
        assert_that!(manager.config_path(), none());
    }

    #[rstest]
    fn reload_picks_up_changes() {
        let temp_dir = workspace(r#"{"defaultLocale": "fr"}"#);
        let mut manager = ConfigManager::new();
        manager.load_settings(Some(temp_dir.path())).unwrap();

        assert_that!(manager.reload().unwrap(), eq(false));

        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"defaultLocale": "de"}"#).unwrap();

        assert_that!(manager.reload().unwrap(), eq(true));
        assert_that!(manager.get_settings().default_locale, eq("de"));
    }

    #[rstest]
    fn reload_without_file_is_noop() {
        let mut manager = ConfigManager::new();

        assert_that!(manager.reload().unwrap(), eq(false));
    }

    #[rstest]
    fn update_settings_reports_change() {
        let mut manager = ConfigManager::new();
        let new_settings =
            RuntimeSettings { default_locale: "ja".to_string(), ..RuntimeSettings::default() };

        assert_that!(manager.update_settings(new_settings.clone()).unwrap(), eq(true));
        assert_that!(manager.update_settings(new_settings).unwrap(), eq(false));
        assert_that!(manager.get_settings().default_locale, eq("ja"));
    }

    #[rstest]
    fn update_settings_rejects_invalid() {
        let mut manager = ConfigManager::new();
        let new_settings =
            RuntimeSettings { default_locale: String::new(), ..RuntimeSettings::default() };

        assert_that!(manager.update_settings(new_settings).is_err(), eq(true));
        assert_that!(manager.get_settings().default_locale, eq("en"));
    }
}
