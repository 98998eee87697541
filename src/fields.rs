//! Value coercion strategies for remote field values.
//!
//! Airtable emits heterogeneous JSON per field: bare scalars, lists
//! (multi-select, lookups), attachment objects, and tagged sentinel
//! objects standing in for NaN/Infinity/error. Each column gets one
//! [`Coercion`] strategy, chosen at adapter construction, that maps a raw
//! [`serde_json::Value`] to a [`Cell`].
//!
//! Invariants:
//! - absent or null input always parses to [`Cell::Null`]
//! - an out-of-domain shape fails with [`CoerceError::Type`]
//! - a recognized shape with a disallowed semantic (over-long list,
//!   unknown sentinel tag) fails with [`CoerceError::Value`]

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while coercing a single field value.
#[derive(Debug, Error)]
pub enum CoerceError {
    /// The value's runtime shape matches no recognized branch.
    #[error("{0}")]
    Type(String),

    /// The shape is recognized but the content is disallowed.
    #[error("{0}")]
    Value(String),
}

/// A coerced field value as surfaced to the SQL host.
///
/// This is not `serde_json::Value`: numeric sentinels (NaN, ±Infinity)
/// have no JSON number representation but are legal cell contents here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float, possibly NaN or ±Infinity.
    Float(f64),
    /// UTF-8 string.
    Text(String),
}

impl Cell {
    /// Returns `true` for [`Cell::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the numeric content as `f64`, if this cell is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// A column's coercion strategy.
///
/// The variant is picked once, at adapter construction (by inference or
/// from metadata), and dispatch happens on this explicit discriminant
/// rather than ad-hoc type tests at call sites.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// String/number/boolean passthrough, plus sentinel decoding and
    /// attachment-object serialization.
    Scalar,

    /// Numbers, with tagged sentinel objects decoded to NaN/±Infinity.
    SpecialNumeric,

    /// Unwraps a single-element list to its scalar; empty list is null.
    ///
    /// Lists longer than one element are joined with `", "` when
    /// `allow_multiple` is set, and rejected otherwise.
    ListCollapse {
        /// Strategy applied to each list element.
        item: Box<Coercion>,
        /// Whether multi-element lists collapse to a joined string.
        allow_multiple: bool,
    },

    /// Dispatches on runtime shape: lists take the list-collapse path,
    /// everything else the item path.
    ///
    /// Lets one declared column type accept both single-valued and
    /// multi-valued observed data.
    MaybeList {
        /// Strategy applied to scalars and list elements.
        item: Box<Coercion>,
        /// Whether multi-element lists collapse to a joined string.
        allow_multiple: bool,
    },
}

impl Coercion {
    /// The lenient string-or-list strategy used for metadata-declared
    /// columns and as the inference fallback.
    #[must_use]
    pub fn maybe_list_string() -> Self {
        Self::MaybeList {
            item: Box::new(Self::Scalar),
            allow_multiple: true,
        }
    }

    /// Coerces a raw field value.
    ///
    /// `None` means the field was absent from the record (Airtable omits
    /// blank fields entirely) and always parses to [`Cell::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`CoerceError::Type`] for unrecognized shapes and
    /// [`CoerceError::Value`] for disallowed content.
    pub fn parse(&self, raw: Option<&Value>) -> Result<Cell, CoerceError> {
        let Some(value) = raw else {
            return Ok(Cell::Null);
        };
        match self {
            Self::Scalar => parse_scalar(value),
            Self::SpecialNumeric => parse_numeric(value),
            Self::ListCollapse {
                item,
                allow_multiple,
            } => match value {
                Value::Null => Ok(Cell::Null),
                Value::Array(items) => collapse_list(items, item, *allow_multiple),
                other => Err(CoerceError::Type(format!(
                    "expected a list, got {}",
                    shape_name(other)
                ))),
            },
            Self::MaybeList {
                item,
                allow_multiple,
            } => match value {
                Value::Array(items) => collapse_list(items, item, *allow_multiple),
                other => item.parse(Some(other)),
            },
        }
    }
}

/// Human-readable shape name for error messages.
fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn number_cell(n: &serde_json::Number) -> Cell {
    n.as_i64()
        .map_or_else(|| Cell::Float(n.as_f64().unwrap_or(f64::NAN)), Cell::Int)
}

/// Decodes a tagged sentinel object, if the map is one.
///
/// Returns `Ok(None)` when the map carries no recognized sentinel key,
/// letting the caller try other object interpretations.
fn parse_sentinel(map: &Map<String, Value>) -> Result<Option<Cell>, CoerceError> {
    if let Some(tag) = map.get("specialValue") {
        return match tag.as_str() {
            Some("NaN") => Ok(Some(Cell::Float(f64::NAN))),
            Some("Infinity") => Ok(Some(Cell::Float(f64::INFINITY))),
            Some("-Infinity") => Ok(Some(Cell::Float(f64::NEG_INFINITY))),
            _ => Err(CoerceError::Value(format!(
                "unrecognized special value: {tag}"
            ))),
        };
    }
    if let Some(tag) = map.get("error") {
        return match tag.as_str() {
            // "#ERROR" is a recoverable sentinel, not a failure.
            Some("#ERROR") => Ok(Some(Cell::Float(f64::NAN))),
            _ => Err(CoerceError::Value(format!(
                "unrecognized error marker: {tag}"
            ))),
        };
    }
    Ok(None)
}

fn parse_scalar(value: &Value) -> Result<Cell, CoerceError> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Bool(b) => Ok(Cell::Bool(*b)),
        Value::Number(n) => Ok(number_cell(n)),
        Value::String(s) => Ok(Cell::Text(s.clone())),
        Value::Object(map) => {
            if let Some(cell) = parse_sentinel(map)? {
                return Ok(cell);
            }
            // Attachment-like objects carry an "id" key; surface them as
            // their canonical JSON string rather than rejecting.
            if map.contains_key("id") {
                return serde_json::to_string(value)
                    .map(Cell::Text)
                    .map_err(|e| CoerceError::Type(e.to_string()));
            }
            Err(CoerceError::Type(format!(
                "unrecognized object shape: {value}"
            )))
        }
        Value::Array(_) => Err(CoerceError::Type(
            "cannot coerce nested list to scalar".into(),
        )),
    }
}

fn parse_numeric(value: &Value) -> Result<Cell, CoerceError> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Number(n) => Ok(number_cell(n)),
        Value::Object(map) => match parse_sentinel(map)? {
            Some(cell) => Ok(cell),
            None => Err(CoerceError::Type(format!(
                "unrecognized object shape: {value}"
            ))),
        },
        other => Err(CoerceError::Type(format!(
            "cannot coerce {} to number",
            shape_name(other)
        ))),
    }
}

fn collapse_list(
    items: &[Value],
    item: &Coercion,
    allow_multiple: bool,
) -> Result<Cell, CoerceError> {
    match items {
        [] => Ok(Cell::Null),
        [single] => item.parse(Some(single)),
        many => {
            if !allow_multiple {
                return Err(CoerceError::Value(
                    "cannot collapse list of length > 1".into(),
                ));
            }
            let parts = many
                .iter()
                .map(|v| item.parse(Some(v)).map(|cell| cell.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Cell::Text(parts.join(", ")))
        }
    }
}
