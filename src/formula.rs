//! Filter-to-formula translation.
//!
//! Converts the host framework's per-column [`Filter`]s into Airtable
//! formula fragments and composes them with `AND(...)`. Composition never
//! wraps a single fragment: `AND` of one argument collapses to the
//! argument itself, and zero fragments mean an unfiltered fetch.

use indexmap::IndexMap;

use crate::api::ID_COLUMN;
use crate::error::{AdapterError, AdapterResult};
use crate::filter::{Filter, Range, ScalarValue};

const TRUE_FN: &str = "TRUE()";
const FALSE_FN: &str = "FALSE()";

/// Translation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateOptions {
    /// Translate a range with equal, doubly inclusive bounds as an
    /// equality instead of two comparisons. Off by default.
    pub simplify_point_ranges: bool,
}

/// Renders a field reference: `{name}`.
#[must_use]
pub fn field_reference(name: &str) -> String {
    format!("{{{name}}}")
}

/// String-cast via concatenation with the empty string.
///
/// Airtable formulas treat blank and numeric zero ambiguously, so null
/// checks compare the string-cast field instead of the field itself.
fn str_cast(expr: &str) -> String {
    format!("{expr} & \"\"")
}

fn if_formula(condition: &str, when_true: &str, when_false: &str) -> String {
    format!("IF({condition}, {when_true}, {when_false})")
}

/// ANDs fragments together; one fragment stays unwrapped, zero yield
/// `None`.
fn and_join(mut parts: Vec<String>) -> Option<String> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("AND({})", parts.join(","))),
    }
}

/// Equality against a field, or a record-identity lookup when the field
/// is the synthetic identifier (which is not a regular remote field).
fn equality(field: &str, value: &ScalarValue) -> String {
    if field == ID_COLUMN {
        format!("RECORD_ID()={value}")
    } else {
        format!("{}={value}", field_reference(field))
    }
}

fn range_formula(field: &str, range: &Range, options: TranslateOptions) -> String {
    if options.simplify_point_ranges {
        if let (Some(start), Some(end)) = (&range.start, &range.end) {
            if start == end && range.include_start && range.include_end {
                return equality(field, start);
            }
        }
    }

    let reference = field_reference(field);
    let mut parts = Vec::with_capacity(2);
    if let Some(start) = &range.start {
        let op = if range.include_start { ">=" } else { ">" };
        parts.push(format!("{reference} {op} {start}"));
    }
    if let Some(end) = &range.end {
        let op = if range.include_end { "<=" } else { "<" };
        parts.push(format!("{reference} {op} {end}"));
    }
    // Both bounds absent: degenerate range, vacuously true.
    and_join(parts).unwrap_or_else(|| TRUE_FN.to_string())
}

/// Translates one column's filter into a formula fragment.
///
/// # Errors
///
/// Returns [`AdapterError::Unsupported`] for filter kinds with no formula
/// translation, before any network call.
pub fn filter_formula(
    field: &str,
    filter: &Filter,
    options: TranslateOptions,
) -> AdapterResult<String> {
    match filter {
        Filter::IsNull => Ok(if_formula(
            &str_cast(&field_reference(field)),
            FALSE_FN,
            TRUE_FN,
        )),
        Filter::IsNotNull => Ok(if_formula(
            &str_cast(&field_reference(field)),
            TRUE_FN,
            FALSE_FN,
        )),
        Filter::Range(range) => Ok(range_formula(field, range, options)),
        Filter::Equal { value } => Ok(equality(field, value)),
        Filter::NotEqual { value } => Ok(format!("{}!={value}", field_reference(field))),
        Filter::Like { .. } => Err(AdapterError::Unsupported(format!(
            "no formula translation for {:?} on field '{field}'",
            filter.kind()
        ))),
    }
}

/// Translates a full bounds mapping into a single formula.
///
/// Fragments are ANDed in bounds order; a single fragment is returned
/// unwrapped and an empty bounds mapping yields `None` (unfiltered
/// fetch).
///
/// # Errors
///
/// Returns [`AdapterError::Unsupported`] if any column's filter has no
/// formula translation.
pub fn bounds_formula(
    bounds: &IndexMap<String, Filter>,
    options: TranslateOptions,
) -> AdapterResult<Option<String>> {
    let mut parts = Vec::with_capacity(bounds.len());
    for (field, filter) in bounds {
        parts.push(filter_formula(field, filter, options)?);
    }
    Ok(and_join(parts))
}
