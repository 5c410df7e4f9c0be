//! Content addressing for source strings.
//!
//! A source string is identified by an 8 digit lowercase hex key derived from its trimmed
//! text and optional disambiguation context. Keys are persisted as storage lookup keys, so
//! [`derive_key`] must produce the same output on every platform and in every release.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

use crate::config::LimitsConfig;
use crate::validation::{
    ValidationError,
    validate_batch_size,
    validate_context,
    validate_hash,
    validate_source_text,
};

/// Number of hex digits in a derived key.
pub const KEY_LENGTH: usize = 8;

/// djb2 の初期値
const HASH_SEED: u32 = 5381;
/// djb2 の乗数
const HASH_MULTIPLIER: u32 = 33;

/// Lookup key of a source string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Parses a caller-supplied hash.
    ///
    /// # Errors
    /// Returns an error if the hash is empty, too long or not alphanumeric.
    pub fn parse(hash: &str, limits: &LimitsConfig) -> Result<Self, ValidationError> {
        validate_hash(hash, limits)?;
        Ok(Self(hash.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the lookup key for `text` under an optional `context`.
///
/// Leading and trailing whitespace of `text` never affects the key. An empty context is
/// treated as no context.
///
/// # Examples
/// ```
/// use i18n_runtime::hash::derive_key;
///
/// assert_eq!(derive_key("  Hello ", None), derive_key("Hello", None));
/// assert_ne!(derive_key("Submit", Some("form")), derive_key("Submit", None));
/// assert_eq!(derive_key("", None).as_str(), "00001505");
/// ```
#[must_use]
pub fn derive_key(text: &str, context: Option<&str>) -> Key {
    let trimmed = text.trim();
    let hash = match context.filter(|ctx| !ctx.is_empty()) {
        Some(ctx) => hash_str(&format!("{ctx}::{trimmed}")),
        None => hash_str(trimmed),
    };
    Key(format!("{hash:08x}"))
}

/// `h = (h * 33) ^ unit` over UTF-16 code units, wrapping at 32 bits.
///
/// Keys must match the ones written by browser clients, which hash UTF-16.
fn hash_str(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(HASH_SEED, |hash, unit| hash.wrapping_mul(HASH_MULTIPLIER) ^ u32::from(unit))
}

/// A source string as written in application code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceString {
    pub hash: Key,
    pub text: String,
    pub context: Option<String>,
}

impl SourceString {
    #[must_use]
    pub fn new(text: impl Into<String>, context: Option<String>) -> Self {
        let text = text.into();
        let hash = derive_key(&text, context.as_deref());
        Self { hash, text, context }
    }

    /// The input the key was derived from, ignoring cosmetic whitespace.
    fn normalized(&self) -> (Option<&str>, &str) {
        (self.context.as_deref().filter(|ctx| !ctx.is_empty()), self.text.trim())
    }
}

/// Two or more distinct source strings that derived the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub hash: Key,
    /// The colliding strings, in input order.
    pub strings: Vec<SourceString>,
}

/// Result of [`ingest_batch`].
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub strings: Vec<SourceString>,
    pub collisions: Vec<KeyCollision>,
}

/// Finds keys shared by source strings whose normalized text or context differ.
///
/// Repeated occurrences of the same string are not collisions.
#[must_use]
pub fn find_collisions(strings: &[SourceString]) -> Vec<KeyCollision> {
    let mut by_hash: HashMap<&Key, Vec<&SourceString>> = HashMap::new();
    let mut order = Vec::new();
    for string in strings {
        let group = by_hash.entry(&string.hash).or_default();
        if group.is_empty() {
            order.push(&string.hash);
        }
        if !group.iter().any(|seen| seen.normalized() == string.normalized()) {
            group.push(string);
        }
    }

    order
        .into_iter()
        .filter_map(|hash| {
            let group = by_hash.remove(hash)?;
            (group.len() > 1).then(|| KeyCollision {
                hash: hash.clone(),
                strings: group.into_iter().cloned().collect(),
            })
        })
        .collect()
}

/// Validates and hashes a batch of `(text, context)` pairs.
///
/// Collisions are reported, not rejected: the runtime tolerates them and leaves resolution to
/// whoever maintains the source strings.
///
/// # Errors
/// Returns the first limit violation, with the offending item index in the field path.
pub fn ingest_batch(
    inputs: &[(String, Option<String>)],
    limits: &LimitsConfig,
) -> Result<IngestReport, ValidationError> {
    validate_batch_size(inputs.len(), limits)?;

    let mut strings = Vec::with_capacity(inputs.len());
    for (index, (text, context)) in inputs.iter().enumerate() {
        validate_source_text(text, limits).map_err(|e| at_index(e, index))?;
        if let Some(context) = context {
            validate_context(context, limits).map_err(|e| at_index(e, index))?;
        }
        strings.push(SourceString::new(text.clone(), context.clone()));
    }

    let collisions = find_collisions(&strings);
    for collision in &collisions {
        tracing::warn!(
            hash = %collision.hash,
            count = collision.strings.len(),
            "Distinct source strings share a key"
        );
    }

    Ok(IngestReport { strings, collisions })
}

/// エラーのパスを `items[i].` 付きにする
fn at_index(error: ValidationError, index: usize) -> ValidationError {
    ValidationError::new(format!("items[{index}].{}", error.field_path), error.message)
}


#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::{
        KEY_LENGTH,
        Key,
        derive_key,
    };

    fn is_key_format(key: &Key) -> bool {
        key.as_str().len() == KEY_LENGTH
            && key.as_str().chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    proptest! {
        #[test]
        fn derive_key_is_deterministic(text in ".*", context in proptest::option::of(".{0,20}")) {
            prop_assert_eq!(
                derive_key(&text, context.as_deref()),
                derive_key(&text, context.as_deref())
            );
        }

        #[test]
        fn derive_key_ignores_surrounding_whitespace(
            text in ".*",
            leading in "[ \t\n]{0,4}",
            trailing in "[ \t\n]{0,4}",
        ) {
            let padded = format!("{leading}{text}{trailing}");
            prop_assert_eq!(derive_key(&padded, None), derive_key(&text, None));
        }

        #[test]
        fn derive_key_always_has_key_format(text in "\\PC*", context in proptest::option::of("\\PC*")) {
            prop_assert!(is_key_format(&derive_key(&text, context.as_deref())));
        }
    }
}
