//! Boundary validation for values entering the runtime.
//!
//! Everything here rejects oversized or malformed input before it reaches the core.
//! Nothing is truncated at this layer.

use thiserror::Error;

use crate::config::LimitsConfig;

/// A single rejected field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "limits.maxIterations", "items[3].context")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

/// Source text size in bytes must stay within `maxSourceTextLength`.
pub fn validate_source_text(text: &str, limits: &LimitsConfig) -> Result<(), ValidationError> {
    if text.len() > limits.max_source_text_length {
        return Err(ValidationError::new(
            "text",
            format!(
                "Source text is {} bytes, the maximum is {}",
                text.len(),
                limits.max_source_text_length
            ),
        ));
    }
    Ok(())
}

/// Context strings are counted in characters.
pub fn validate_context(context: &str, limits: &LimitsConfig) -> Result<(), ValidationError> {
    let length = context.chars().count();
    if length > limits.max_context_length {
        return Err(ValidationError::new(
            "context",
            format!(
                "Context is {length} characters, the maximum is {}",
                limits.max_context_length
            ),
        ));
    }
    Ok(())
}

/// Accepts BCP 47 shaped codes: a 2-3 letter language subtag followed by
/// any number of 2-8 character alphanumeric subtags (`en`, `pt-BR`, `zh-Hant-TW`).
pub fn validate_locale(locale: &str, limits: &LimitsConfig) -> Result<(), ValidationError> {
    if locale.is_empty() {
        return Err(ValidationError::new("locale", "Locale code cannot be empty"));
    }
    if locale.len() > limits.max_locale_length {
        return Err(ValidationError::new(
            "locale",
            format!("Locale code exceeds {} characters", limits.max_locale_length),
        ));
    }
    if !is_locale_code(locale) {
        return Err(ValidationError::new(
            "locale",
            format!("'{locale}' is not a valid locale code. Example: \"en\", \"pt-BR\""),
        ));
    }
    Ok(())
}

/// Returns true if `code` has the shape of a BCP 47 language tag.
#[must_use]
pub fn is_locale_code(code: &str) -> bool {
    let mut subtags = code.split('-');
    let Some(language) = subtags.next() else {
        return false;
    };
    if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    subtags.all(|subtag| {
        (2..=8).contains(&subtag.len()) && subtag.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// Hashes coming from callers must be alphanumeric and no longer than `maxHashLength`.
pub fn validate_hash(hash: &str, limits: &LimitsConfig) -> Result<(), ValidationError> {
    if hash.is_empty() {
        return Err(ValidationError::new("hash", "Hash cannot be empty"));
    }
    if hash.len() > limits.max_hash_length {
        return Err(ValidationError::new(
            "hash",
            format!("Hash exceeds {} characters", limits.max_hash_length),
        ));
    }
    if !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("hash", "Hash must be alphanumeric"));
    }
    Ok(())
}

pub fn validate_batch_size(size: usize, limits: &LimitsConfig) -> Result<(), ValidationError> {
    if size > limits.max_batch_size {
        return Err(ValidationError::new(
            "items",
            format!("Batch contains {size} items, the maximum is {}", limits.max_batch_size),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::language_only("en", true)]
    #[case::three_letter("kok", true)]
    #[case::region("pt-BR", true)]
    #[case::script_and_region("zh-Hant-TW", true)]
    #[case::numeric_region("es-419", true)]
    #[case::empty("", false)]
    #[case::single_letter("e", false)]
    #[case::underscore("en_US", false)]
    #[case::trailing_hyphen("en-", false)]
    #[case::digits_in_language("e1", false)]
    #[case::too_long_subtag("en-abcdefghi", false)]
    fn test_is_locale_code(#[case] code: &str, #[case] expected: bool) {
        assert_that!(is_locale_code(code), eq(expected));
    }

    #[rstest]
    fn validate_locale_rejects_oversized_code() {
        let limits = LimitsConfig { max_locale_length: 5, ..LimitsConfig::default() };

        assert_that!(
            validate_locale("zh-Hant-TW", &limits),
            err(all![
                field!(ValidationError.field_path, eq("locale")),
                field!(ValidationError.message, contains_substring("exceeds 5"))
            ])
        );
    }

    #[rstest]
    fn validate_source_text_counts_bytes() {
        let limits = LimitsConfig { max_source_text_length: 4, ..LimitsConfig::default() };

        assert_that!(validate_source_text("abcd", &limits), ok(anything()));
        // "éé" is 4 bytes, "ééé" is 6
        assert_that!(validate_source_text("éé", &limits), ok(anything()));
        assert_that!(
            validate_source_text("ééé", &limits),
            err(field!(ValidationError.message, contains_substring("6 bytes")))
        );
    }

    #[rstest]
    fn validate_context_counts_characters() {
        let limits = LimitsConfig { max_context_length: 3, ..LimitsConfig::default() };

        assert_that!(validate_context("ééé", &limits), ok(anything()));
        assert_that!(
            validate_context("form", &limits),
            err(field!(ValidationError.field_path, eq("context")))
        );
    }

    #[rstest]
    #[case::valid("a1b2c3d4", true)]
    #[case::sixteen_chars("0123456789abcdef", true)]
    #[case::too_long("0123456789abcdef0", false)]
    #[case::symbol("a1b2-3d4", false)]
    #[case::empty("", false)]
    fn test_validate_hash(#[case] hash: &str, #[case] valid: bool) {
        let result = validate_hash(hash, &LimitsConfig::default());

        assert_that!(result.is_ok(), eq(valid));
    }

    #[rstest]
    fn validate_batch_size_limit() {
        let limits = LimitsConfig::default();

        assert_that!(validate_batch_size(1000, &limits), ok(anything()));
        assert_that!(
            validate_batch_size(1001, &limits),
            err(field!(ValidationError.message, contains_substring("1001 items")))
        );
    }
}
