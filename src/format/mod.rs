//! Message formatting: ICU-style plural and select patterns, parameter values and plural rules.

mod formatter;
mod plural;
mod value;

pub use formatter::{
    DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_NESTING_DEPTH,
    DEFAULT_MAX_TEXT_LENGTH,
    ErrorCallback,
    FormatError,
    FormatOptions,
    format,
    substitute_placeholders,
};
pub use plural::{
    DEFAULT_PLURAL_LOCALE,
    PluralCategory,
    PluralCategoryProvider,
    PluralRuleCache,
    get_category,
};
pub use value::{
    Params,
    Value,
};
