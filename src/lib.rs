//! i18n-runtime
//!
//! リクエスト単位で翻訳を解決するランタイム
//!
//! - [`hash`]: ソース文字列から安定したキーを導出
//! - [`format`]: ICU 風の plural / select パターンを上限付きで展開
//! - [`locale`]: ロケールのフォールバックチェーン
//! - [`cache`]: ロケールごとの翻訳キャッシュ
//! - [`scope`]: リクエスト単位のスコープと `t` 関数
//! - [`runtime`]: 上記を組み合わせてスコープを作成

pub mod cache;
pub mod config;
pub mod format;
pub mod hash;
pub mod locale;
pub mod runtime;
pub mod scope;
pub mod storage;
pub mod validation;

pub use runtime::{
    RuntimeError,
    TranslationRuntime,
};
pub use scope::{
    LookupOptions,
    TranslationScope,
    t,
};
