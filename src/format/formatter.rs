//! Bounded interpreter for ICU-style message patterns.
//!
//! Supported syntax:
//! - `{name}` placeholders
//! - `{name, plural, =0 {..} one {..} other {..}}` with `#` standing for the number
//! - `{name, select, male {..} female {..} other {..}}`
//!
//! Branches may nest further blocks. Formatting never fails: malformed patterns and limit
//! violations are reported through [`FormatOptions::on_error`] and the best-effort result is
//! returned.

use std::fmt;

use thiserror::Error;

use super::plural::{
    PluralCategory,
    PluralCategoryProvider,
};
use super::value::{
    Params,
    Value,
};
use crate::config::LimitsConfig;

pub const DEFAULT_MAX_TEXT_LENGTH: usize = 50_000;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 5;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Problems found while formatting. Always recovered, never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Pattern is {length} characters long, truncated to {max}")]
    PatternTooLong { length: usize, max: usize },

    #[error("Blocks nested deeper than {max} levels are left as literal text")]
    NestingTooDeep { max: usize },

    #[error("More than {max} blocks in one pattern, only simple placeholders were substituted")]
    TooManyIterations { max: usize },

    #[error("Unterminated block at byte {offset}")]
    UnterminatedBlock { offset: usize },

    #[error("Missing branch body after selector '{selector}' in '{argument}'")]
    MissingBranchBody { argument: String, selector: String },

    #[error("Missing selector before branch body in '{argument}'")]
    MissingSelector { argument: String },

    #[error("No branch matches '{argument}' and there is no 'other' branch")]
    MissingOtherBranch { argument: String },

    #[error("Plural argument '{argument}' is not a number: '{value}'")]
    NotANumber { argument: String, value: String },
}

/// Callback invoked for every recovered [`FormatError`].
pub type ErrorCallback<'a> = dyn Fn(&FormatError) + Send + Sync + 'a;

/// Locale, plural rules, limits and error sink for one `format` call.
#[derive(Clone, Copy)]
pub struct FormatOptions<'a> {
    pub locale: &'a str,
    /// Falls back to the English rule when unset.
    pub plural_rules: Option<&'a dyn PluralCategoryProvider>,
    pub max_nesting_depth: usize,
    /// In characters.
    pub max_text_length: usize,
    pub max_iterations: usize,
    pub on_error: Option<&'a ErrorCallback<'a>>,
}

impl<'a> FormatOptions<'a> {
    #[must_use]
    pub const fn new(locale: &'a str) -> Self {
        Self {
            locale,
            plural_rules: None,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            on_error: None,
        }
    }

    #[must_use]
    pub const fn with_plural_rules(mut self, rules: &'a dyn PluralCategoryProvider) -> Self {
        self.plural_rules = Some(rules);
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: &LimitsConfig) -> Self {
        self.max_nesting_depth = limits.max_nesting_depth;
        self.max_text_length = limits.max_pattern_length;
        self.max_iterations = limits.max_iterations;
        self
    }

    #[must_use]
    pub const fn with_error_callback(mut self, on_error: &'a ErrorCallback<'a>) -> Self {
        self.on_error = Some(on_error);
        self
    }

    /// ログに残し、コールバックがあれば呼ぶ
    fn report(&self, error: &FormatError) {
        tracing::debug!(locale = self.locale, %error, "Recovered message format error");
        if let Some(on_error) = self.on_error {
            on_error(error);
        }
    }

    /// ルールが未設定なら英語のルール
    fn category(&self, value: &Value) -> PluralCategory {
        self.plural_rules.map_or_else(
            || PluralCategory::english(value),
            |rules| rules.category(value, self.locale),
        )
    }
}

impl fmt::Debug for FormatOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatOptions")
            .field("locale", &self.locale)
            .field("plural_rules", &self.plural_rules.map(|_| "<PluralCategoryProvider>"))
            .field("max_nesting_depth", &self.max_nesting_depth)
            .field("max_text_length", &self.max_text_length)
            .field("max_iterations", &self.max_iterations)
            .field("on_error", &self.on_error.map(|_| "<ErrorCallback>"))
            .finish()
    }
}

/// Formats `pattern` with `params`.
///
/// # Examples
/// ```
/// use i18n_runtime::format::{FormatOptions, Params, Value, format};
///
/// let params = Params::from([("count".to_string(), Value::from(5))]);
/// let text = format(
///     "{count, plural, one {# item} other {# items}}",
///     &params,
///     &FormatOptions::new("en"),
/// );
/// assert_eq!(text, "5 items");
/// ```
#[must_use]
pub fn format(pattern: &str, params: &Params, options: &FormatOptions<'_>) -> String {
    let pattern = truncate(pattern, options);

    if !pattern.contains('{') {
        return pattern.to_string();
    }

    let mut interpreter = Interpreter { params, options, iterations: 0 };
    match interpreter.format_text(pattern, 0, None) {
        Ok(formatted) => formatted,
        Err(error) => {
            options.report(&error);
            substitute_placeholders(pattern, params)
        }
    }
}

/// `maxTextLength` を超える部分を切り捨てる
fn truncate<'p>(pattern: &'p str, options: &FormatOptions<'_>) -> &'p str {
    let Some((cut, _)) = pattern.char_indices().nth(options.max_text_length) else {
        return pattern;
    };
    options.report(&FormatError::PatternTooLong {
        length: pattern.chars().count(),
        max: options.max_text_length,
    });
    &pattern[..cut]
}

/// Replaces `{name}` placeholders that have a value, leaving everything else as written.
#[must_use]
pub fn substitute_placeholders(pattern: &str, params: &Params) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replacement = after
            .find(['{', '}'])
            .filter(|&end| after[end..].starts_with('}'))
            .and_then(|end| {
                let name = after[..end].trim();
                is_identifier(name).then(|| params.get(name)).flatten().map(|value| (end, value))
            });

        match replacement {
            Some((end, value)) => {
                out.push_str(&value.to_string());
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// パターンの展開状態
struct Interpreter<'p, 'o> {
    /// 引数
    params: &'p Params,
    /// 制限とロケール
    options: &'o FormatOptions<'o>,
    /// 処理したブロック数
    iterations: usize,
}

/// A `selector {body}` pair inside a plural or select block.
struct Branch<'t> {
    /// `one`、`=0`、`other` など
    selector: &'t str,
    /// 中括弧の中身
    body: &'t str,
}

impl Interpreter<'_, '_> {
    /// Formats literal text interleaved with blocks. `pound` is the value `#` stands for
    /// inside a plural branch.
    fn format_text(
        &mut self,
        text: &str,
        depth: usize,
        pound: Option<&Value>,
    ) -> Result<String, FormatError> {
        let mut out = String::with_capacity(text.len());
        let mut offset = 0;

        while let Some(found) =
            text[offset..].find(|c: char| c == '{' || (c == '#' && pound.is_some()))
        {
            let start = offset + found;
            out.push_str(&text[offset..start]);

            if let Some(value) = pound.filter(|_| text[start..].starts_with('#')) {
                out.push_str(&value.to_string());
                offset = start + 1;
                continue;
            }

            if depth >= self.options.max_nesting_depth {
                self.options.report(&FormatError::NestingTooDeep {
                    max: self.options.max_nesting_depth,
                });
                out.push_str(&text[start..]);
                return Ok(out);
            }

            let end = find_closing(text, start)
                .ok_or(FormatError::UnterminatedBlock { offset: start })?;
            out.push_str(&self.resolve_block(&text[start..=end], depth, pound)?);
            offset = end + 1;
        }

        out.push_str(&text[offset..]);
        Ok(out)
    }

    /// `block` includes its outer braces.
    fn resolve_block(
        &mut self,
        block: &str,
        depth: usize,
        pound: Option<&Value>,
    ) -> Result<String, FormatError> {
        let inner = &block[1..block.len() - 1];
        let split = split_top_level_comma(inner);
        let name = split.map_or(inner, |(name, _)| name).trim();
        // 引数名でなければただの文字列
        if !is_identifier(name) {
            return Ok(block.to_string());
        }

        self.iterations += 1;
        if self.iterations > self.options.max_iterations {
            return Err(FormatError::TooManyIterations { max: self.options.max_iterations });
        }
        let Some((_, rest)) = split else {
            return Ok(self.placeholder(name, block));
        };

        let (kind, branches) = split_top_level_comma(rest).unwrap_or((rest, ""));
        match kind.trim() {
            "plural" => self.resolve_plural(block, name, branches, depth),
            "select" => self.resolve_select(block, name, branches, depth, pound),
            // Other argument types (number, date, ...) get plain substitution.
            _ => Ok(self.placeholder(name, block)),
        }
    }

    /// `{name}` を値で置き換える。値がなければそのまま
    fn placeholder(&self, name: &str, block: &str) -> String {
        self.params.get(name).map_or_else(|| block.to_string(), ToString::to_string)
    }

    /// `=N`、カテゴリ、`other` の順に分岐を選ぶ
    fn resolve_plural(
        &mut self,
        block: &str,
        name: &str,
        branches_text: &str,
        depth: usize,
    ) -> Result<String, FormatError> {
        let Some(value) = self.params.get(name) else {
            return Ok(block.to_string());
        };
        let branches = parse_branches(name, branches_text)?;

        let Some(number) = value.to_numeric() else {
            self.options.report(&FormatError::NotANumber {
                argument: name.to_string(),
                value: value.to_string(),
            });
            return Ok(block.to_string());
        };

        let exact = number.as_integer().and_then(|n| {
            branches.iter().find(|branch| {
                branch
                    .selector
                    .strip_prefix('=')
                    .and_then(|target| target.trim().parse::<i64>().ok())
                    .is_some_and(|target| target == n)
            })
        });
        let chosen = exact
            .or_else(|| {
                let category = self.options.category(&number);
                branches.iter().find(|branch| branch.selector == category.as_str())
            })
            .or_else(|| branches.iter().find(|branch| branch.selector == "other"));

        let Some(branch) = chosen else {
            self.options.report(&FormatError::MissingOtherBranch { argument: name.to_string() });
            return Ok(block.to_string());
        };
        self.format_text(branch.body, depth + 1, Some(&number))
    }

    /// 値と一致する分岐、なければ `other`
    fn resolve_select(
        &mut self,
        block: &str,
        name: &str,
        branches_text: &str,
        depth: usize,
        pound: Option<&Value>,
    ) -> Result<String, FormatError> {
        let Some(value) = self.params.get(name) else {
            return Ok(block.to_string());
        };
        let branches = parse_branches(name, branches_text)?;

        let key = value.to_string();
        let chosen = branches
            .iter()
            .find(|branch| branch.selector == key)
            .or_else(|| branches.iter().find(|branch| branch.selector == "other"));

        let Some(branch) = chosen else {
            self.options.report(&FormatError::MissingOtherBranch { argument: name.to_string() });
            return Ok(block.to_string());
        };
        self.format_text(branch.body, depth + 1, pound)
    }
}

/// Parses `sel1 {body1} sel2 {body2} ...`.
fn parse_branches<'t>(argument: &str, text: &'t str) -> Result<Vec<Branch<'t>>, FormatError> {
    let mut branches = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let selector_end = rest.find(|c: char| c.is_whitespace() || c == '{').unwrap_or(rest.len());
        let selector = &rest[..selector_end];
        if selector.is_empty() {
            return Err(FormatError::MissingSelector { argument: argument.to_string() });
        }

        let after = rest[selector_end..].trim_start();
        if !after.starts_with('{') {
            return Err(FormatError::MissingBranchBody {
                argument: argument.to_string(),
                selector: selector.to_string(),
            });
        }
        let close = find_closing(after, 0).ok_or(FormatError::UnterminatedBlock { offset: 0 })?;

        branches.push(Branch { selector, body: &after[1..close] });
        rest = after[close + 1..].trim_start();
    }

    if branches.is_empty() {
        return Err(FormatError::MissingBranchBody {
            argument: argument.to_string(),
            selector: String::new(),
        });
    }
    Ok(branches)
}

/// Byte index of the `}` matching the `{` at `open`.
fn find_closing(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in text.bytes().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits at the first comma outside nested braces.
fn split_top_level_comma(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (index, byte) in text.bytes().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => return Some((&text[..index], &text[index + 1..])),
            _ => {}
        }
    }
    None
}

/// 引数名として有効か
fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
