//! Remote-fetch collaborator contract.
//!
//! The adapter never talks to the Airtable wire API directly: it consumes
//! a [`TableApi`] implementation that knows how to peek at rows during
//! schema inference and to iterate filtered, sorted pages during a query.
//! Retry and backoff belong to the implementor, not here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Synthetic identifier column appended to every record.
pub const ID_COLUMN: &str = "id";

/// Creation-timestamp column appended in metadata-driven mode.
pub const CREATED_TIME_COLUMN: &str = "createdTime";

/// Result alias for remote-fetch operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors reported by the remote-fetch collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be completed.
    #[error("request failed: {0}")]
    Request(String),

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// One record as returned by the remote table API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque record identifier (not a regular field in the remote schema).
    pub id: String,

    /// ISO-8601 creation timestamp, when the API supplies one.
    #[serde(rename = "createdTime", default)]
    pub created_time: Option<String>,

    /// Field name → raw JSON value. Blank fields are omitted entirely.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// A lazily produced sequence of record pages.
pub type Pages<'a> = Box<dyn Iterator<Item = ApiResult<Vec<Record>>> + 'a>;

/// Blocking access to one remote table.
///
/// Implementations own pagination, authentication, and any retry policy.
/// All calls are synchronous: the adapter is pull-based and single-
/// threaded (one adapter instance per query execution context).
pub trait TableApi {
    /// Fetches the first row of the table, if the table is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the response cannot
    /// be decoded.
    fn first(&self) -> ApiResult<Option<Record>>;

    /// Fetches up to `max_records` rows.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the response cannot
    /// be decoded.
    fn all(&self, max_records: usize) -> ApiResult<Vec<Record>>;

    /// Iterates pages of records matching `formula`, ordered by `sort`.
    ///
    /// `sort` entries are field names, `-`-prefixed for descending order.
    /// `None` for `formula` means an unfiltered fetch. Pages must be
    /// fetched lazily: the next network call happens only when the
    /// returned iterator is advanced past the current page.
    fn iterate(&self, sort: &[String], formula: Option<&str>) -> Pages<'_>;
}

impl<T: TableApi + ?Sized> TableApi for &T {
    fn first(&self) -> ApiResult<Option<Record>> {
        (**self).first()
    }

    fn all(&self, max_records: usize) -> ApiResult<Vec<Record>> {
        (**self).all(max_records)
    }

    fn iterate(&self, sort: &[String], formula: Option<&str>) -> Pages<'_> {
        (**self).iterate(sort, formula)
    }
}
