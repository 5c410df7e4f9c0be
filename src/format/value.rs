//! Interpolation parameter values.

use std::collections::HashMap;
use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// Interpolation parameters keyed by argument name.
pub type Params = HashMap<String, Value>;

/// A value substituted into a message pattern.
///
/// Deserializes from plain JSON numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl Value {
    /// Returns the numeric form of this value, parsing text if needed.
    #[must_use]
    pub fn to_numeric(&self) -> Option<Self> {
        match self {
            Self::Integer(_) => Some(self.clone()),
            Self::Decimal(value) => value.is_finite().then(|| self.clone()),
            Self::Text(text) => {
                let text = text.trim();
                if let Ok(value) = text.parse::<i64>() {
                    return Some(Self::Integer(value));
                }
                text.parse::<f64>().ok().filter(|v| v.is_finite()).map(Self::Decimal)
            }
        }
    }

    /// Returns the value as an integer if it is numerically one (`2.0` is, `2.5` is not).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::float_cmp)]
    pub fn as_integer(&self) -> Option<i64> {
        match self.to_numeric()? {
            Self::Integer(value) => Some(value),
            Self::Decimal(value) => {
                let truncated = value.trunc();
                // i64::MAX is not exactly representable; stay strictly inside the range.
                let in_range = truncated >= i64::MIN as f64 && truncated < i64::MAX as f64;
                (truncated == value && in_range).then_some(truncated as i64)
            }
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Text(value.to_string()), Self::Integer)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::integer(Value::Integer(3), "3")]
    #[case::whole_decimal(Value::Decimal(2.0), "2")]
    #[case::fraction(Value::Decimal(1.5), "1.5")]
    #[case::negative(Value::Integer(-4), "-4")]
    #[case::text(Value::from("$1 #"), "$1 #")]
    fn display(#[case] value: Value, #[case] expected: &str) {
        assert_that!(value.to_string(), eq(expected));
    }

    #[rstest]
    #[case::integer(Value::Integer(7), Some(7))]
    #[case::whole_decimal(Value::Decimal(3.0), Some(3))]
    #[case::fraction(Value::Decimal(3.5), None)]
    #[case::numeric_text(Value::from(" 12 "), Some(12))]
    #[case::decimal_text(Value::from("1.0"), Some(1))]
    #[case::word(Value::from("many"), None)]
    #[case::infinite(Value::Decimal(f64::INFINITY), None)]
    fn as_integer(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_that!(value.as_integer(), eq(expected));
    }

    #[googletest::test]
    fn to_numeric_parses_text() {
        expect_that!(Value::from("2.5").to_numeric(), some(eq(&Value::Decimal(2.5))));
        expect_that!(Value::from("5").to_numeric(), some(eq(&Value::Integer(5))));
        expect_that!(Value::from("five").to_numeric(), none());
    }

    #[googletest::test]
    fn deserializes_from_json() {
        let params: Params =
            serde_json::from_str(r#"{"count": 3, "ratio": 0.5, "name": "Ada"}"#).unwrap_or_default();

        expect_that!(params.get("count"), some(eq(&Value::Integer(3))));
        expect_that!(params.get("ratio"), some(eq(&Value::Decimal(0.5))));
        expect_that!(params.get("name"), some(eq(&Value::from("Ada"))));
    }
}
