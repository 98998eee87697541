//! Filter and sort types consumed from the host query framework.
//!
//! These are the shapes the SQL host hands to the adapter for pushdown:
//! one [`Filter`] per queried column (combined by logical AND across
//! columns) and an ordered list of `(column, SortDirection)` pairs.
//!
//! [`ScalarValue`] literals render in Airtable formula syntax via
//! `Display`: numbers bare, booleans as `1`/`0`, strings single-quoted.

use std::fmt;

/// A scalar literal used in filter comparisons.
///
/// Intentionally small — only types that can appear in an Airtable
/// formula literal are included.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// Boolean, rendered as `1` or `0`.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string, rendered single-quoted.
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", i32::from(*v)),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{}'", v.replace('\'', "\\'")),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// An open or closed range over a single column.
///
/// Either bound may be absent. A range with both bounds absent is
/// degenerate and translates to a vacuously true formula fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Range {
    /// Lower bound, if any.
    pub start: Option<ScalarValue>,
    /// Upper bound, if any.
    pub end: Option<ScalarValue>,
    /// Whether the lower bound is inclusive (`>=` vs `>`).
    pub include_start: bool,
    /// Whether the upper bound is inclusive (`<=` vs `<`).
    pub include_end: bool,
}

/// A filter the host framework requests for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// The column is blank.
    IsNull,
    /// The column is not blank.
    IsNotNull,
    /// The column falls within a range.
    Range(Range),
    /// The column equals a value.
    Equal {
        /// Value to compare against.
        value: ScalarValue,
    },
    /// The column differs from a value.
    NotEqual {
        /// Value to compare against.
        value: ScalarValue,
    },
    /// The column matches a SQL LIKE pattern.
    ///
    /// Part of the host filter set but has no Airtable formula
    /// translation; the translator rejects it rather than dropping it.
    Like {
        /// The LIKE pattern.
        pattern: String,
    },
}

impl Filter {
    /// Returns the discriminant of this filter.
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::IsNull => FilterKind::IsNull,
            Self::IsNotNull => FilterKind::IsNotNull,
            Self::Range(_) => FilterKind::Range,
            Self::Equal { .. } => FilterKind::Equal,
            Self::NotEqual { .. } => FilterKind::NotEqual,
            Self::Like { .. } => FilterKind::Like,
        }
    }
}

/// Filter discriminant, used to advertise per-column pushdown support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Blank check.
    IsNull,
    /// Non-blank check.
    IsNotNull,
    /// Open/closed range.
    Range,
    /// Equality.
    Equal,
    /// Inequality.
    NotEqual,
    /// LIKE pattern match.
    Like,
}

/// Requested sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_value_display() {
        assert_eq!(ScalarValue::Bool(true).to_string(), "1");
        assert_eq!(ScalarValue::Bool(false).to_string(), "0");
        assert_eq!(ScalarValue::Int(42).to_string(), "42");
        assert_eq!(ScalarValue::Float(1.5).to_string(), "1.5");
        assert_eq!(ScalarValue::Text("abc".into()).to_string(), "'abc'");
    }

    #[test]
    fn test_scalar_value_escapes_quotes() {
        assert_eq!(
            ScalarValue::from("O'Brien").to_string(),
            "'O\\'Brien'"
        );
    }

    #[test]
    fn test_filter_kind() {
        assert_eq!(Filter::IsNull.kind(), FilterKind::IsNull);
        assert_eq!(
            Filter::Equal { value: 1i64.into() }.kind(),
            FilterKind::Equal
        );
        assert_eq!(Filter::Range(Range::default()).kind(), FilterKind::Range);
    }
}
