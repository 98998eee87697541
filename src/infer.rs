//! Schema inference from sampled field values.
//!
//! Given the raw values observed for one field across sampled rows,
//! [`guess_field`] picks a coercion strategy and a declared column type.
//! Sampling is inherently unreliable — Airtable omits a field entirely
//! from a record when its value is blank, which biases the sample — so
//! the engine prefers over-permissive typing to spurious failures during
//! full-table scans.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::fields::Coercion;

/// Declared SQL-visible column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// String-like values.
    Text,
    /// Numeric values; ints and floats are unified.
    Number,
    /// Booleans.
    Boolean,
    /// ISO-8601 timestamp strings.
    Timestamp,
}

impl ColumnType {
    /// SQL type name exposed to the host framework.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Number => "REAL",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

/// Result of inferring one field: a coercion strategy plus the declared
/// column type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGuess {
    /// Strategy applied to the field's values at read time.
    pub coercion: Coercion,
    /// Declared SQL-visible type.
    pub column_type: ColumnType,
}

/// Runtime shape of a sampled JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Shape {
    Null,
    Bool,
    Int,
    Float,
    Text,
    List,
    Object,
}

fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Null => Shape::Null,
        Value::Bool(_) => Shape::Bool,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Shape::Int
            } else {
                Shape::Float
            }
        }
        Value::String(_) => Shape::Text,
        Value::Array(_) => Shape::List,
        Value::Object(_) => Shape::Object,
    }
}

fn numeric_guess() -> FieldGuess {
    FieldGuess {
        coercion: Coercion::SpecialNumeric,
        column_type: ColumnType::Number,
    }
}

/// Lenient string-or-list fallback for heterogeneous or unrecognized
/// samples.
fn fallback_guess() -> FieldGuess {
    FieldGuess {
        coercion: Coercion::maybe_list_string(),
        column_type: ColumnType::Text,
    }
}

/// Infers a coercion strategy and column type from sampled values.
///
/// First match wins:
/// 1. a single observed shape maps directly (ints and floats both map to
///    a sentinel-aware numeric strategy, since the remote source is
///    inconsistent about which it emits for the same logical column);
///    lists recurse on the flattened elements of all sampled lists and
///    wrap the item strategy in a list collapse with multi-element
///    joining enabled
/// 2. exactly `{int, float}` unifies to numeric
/// 3. numbers mixed with tagged objects stay numeric with sentinel
///    decoding enabled
/// 4. anything else falls back to the lenient string-or-list strategy
#[must_use]
pub fn guess_field(values: &[Value]) -> FieldGuess {
    guess_refs(&values.iter().collect::<Vec<_>>())
}

fn guess_refs(values: &[&Value]) -> FieldGuess {
    let shapes: BTreeSet<Shape> = values.iter().map(|v| shape_of(v)).collect();

    if shapes.len() == 1 {
        match shapes.iter().next().copied() {
            Some(Shape::Text) => {
                return FieldGuess {
                    coercion: Coercion::Scalar,
                    column_type: ColumnType::Text,
                }
            }
            Some(Shape::Int | Shape::Float) => return numeric_guess(),
            Some(Shape::Bool) => {
                return FieldGuess {
                    coercion: Coercion::Scalar,
                    column_type: ColumnType::Boolean,
                }
            }
            Some(Shape::List) => {
                let items: Vec<&Value> = values
                    .iter()
                    .filter_map(|v| v.as_array())
                    .flatten()
                    .collect();
                let inner = guess_refs(&items);
                return FieldGuess {
                    coercion: Coercion::ListCollapse {
                        item: Box::new(inner.coercion),
                        allow_multiple: true,
                    },
                    column_type: inner.column_type,
                };
            }
            _ => return fallback_guess(),
        }
    }

    if shapes.len() == 2 && shapes.contains(&Shape::Int) && shapes.contains(&Shape::Float) {
        return numeric_guess();
    }

    // Numbers mixed with tagged sentinel objects: keep the column numeric
    // so sentinel decoding is available even though some sampled values
    // were plain numbers.
    if shapes.contains(&Shape::Object)
        && (shapes.contains(&Shape::Int) || shapes.contains(&Shape::Float))
        && shapes
            .iter()
            .all(|s| matches!(s, Shape::Int | Shape::Float | Shape::Object))
    {
        return numeric_guess();
    }

    fallback_guess()
}
