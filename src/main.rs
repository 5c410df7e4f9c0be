//! Command line entry point.
//!
//! ```text
//! i18n-runtime <locale> <text> [--context <context>] [name=value ...]
//! i18n-runtime --list
//! ```
//!
//! Settings are read from the nearest `.i18n-runtime.json` at or above the current directory and
//! translations from its `storage.translationsDir`.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use i18n_runtime::config::{
    ConfigError,
    ConfigManager,
};
use i18n_runtime::storage::{
    JsonDirStorage,
    StorageError,
};
use i18n_runtime::{
    LookupOptions,
    RuntimeError,
    TranslationRuntime,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// 使い方
const USAGE: &str = "Usage: i18n-runtime <locale> <text> [--context <context>] [name=value ...]
       i18n-runtime --list";

/// CLI のエラー
#[derive(Error, Debug)]
enum CliError {
    /// 引数が足りない、または不正
    #[error("Missing or malformed arguments")]
    Usage,

    /// `name=value` の形でないパラメータ
    #[error("Invalid parameter '{0}', expected name=value")]
    InvalidParam(String),

    /// 設定の読み込みに失敗
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// スコープの作成に失敗
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// ストレージの読み込みに失敗
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// 標準出力への書き込みに失敗
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 解析済みのコマンド
enum Command {
    /// 利用可能なロケールを一覧表示
    List,
    /// 1 つの文字列を解決
    Lookup {
        /// 要求されたロケール
        locale: String,
        /// 原文
        text: String,
        /// `--context` と `name=value` から組み立てたオプション
        options: LookupOptions,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder().with_default_directive(LevelFilter::WARN.into()).from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    exit_code(run(std::env::args().skip(1)).await)
}

/// 結果を終了コードにする。エラーはログに出す
fn exit_code(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error @ CliError::Usage) => {
            tracing::error!("{error}\n{USAGE}");
            ExitCode::from(2)
        }
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

/// コマンドを実行
async fn run(args: impl Iterator<Item = String>) -> Result<(), CliError> {
    let command = parse_args(args)?;

    let current_dir = std::env::current_dir()?;
    let mut config_manager = ConfigManager::new();
    config_manager.load_settings(Some(&current_dir))?;
    let settings = config_manager.get_settings().clone();

    // translationsDir は設定ファイルのあるディレクトリからの相対パス
    let base_dir =
        config_manager.config_path().and_then(Path::parent).unwrap_or(current_dir.as_path());
    let translations_dir = base_dir.join(&settings.storage.translations_dir);
    let storage = JsonDirStorage::new(translations_dir, settings.limits);

    match command {
        Command::List => {
            let locales = storage.available_locales()?;
            let mut stdout = std::io::stdout().lock();
            for locale in locales {
                writeln!(stdout, "{locale}")?;
            }
        }
        Command::Lookup { locale, text, options } => {
            let runtime = TranslationRuntime::new(settings, Arc::new(storage));
            let scope = runtime.create_scope(&locale).await?;
            writeln!(std::io::stdout().lock(), "{}", scope.lookup(&text, &options))?;
        }
    }
    Ok(())
}

/// 引数を解析
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command, CliError> {
    let first = args.next().ok_or(CliError::Usage)?;
    if first == "--list" {
        return Ok(Command::List);
    }
    let text = args.next().ok_or(CliError::Usage)?;

    let mut options = LookupOptions::new();
    while let Some(arg) = args.next() {
        if arg == "--context" {
            options = options.context(args.next().ok_or(CliError::Usage)?);
            continue;
        }
        let (name, value) =
            arg.split_once('=').ok_or_else(|| CliError::InvalidParam(arg.clone()))?;
        if name.is_empty() {
            return Err(CliError::InvalidParam(arg));
        }
        options = options.param(name, value);
    }

    Ok(Command::Lookup { locale: first, text, options })
}
