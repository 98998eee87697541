//! Crate-level error types.
//!
//! Provides [`AdapterError`] for schema resolution, filter translation, and
//! row streaming, plus a convenience [`AdapterResult`] alias. Subsystems with
//! their own taxonomy ([`CoerceError`](crate::fields::CoerceError),
//! [`ApiError`](crate::api::ApiError)) convert in via `#[from]` or carry
//! field context as a `#[source]`.

use thiserror::Error;

use crate::api::ApiError;
use crate::fields::CoerceError;

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors that can occur while resolving schemas, translating filters, or
/// streaming rows.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A field value could not be coerced through its column strategy.
    #[error("field '{field}': {source}")]
    Coerce {
        /// Name of the field whose value failed to coerce.
        field: String,
        /// The underlying coercion failure.
        #[source]
        source: CoerceError,
    },

    /// A filter has no formula translation.
    ///
    /// Raised at translation time, before any network call. Dropping the
    /// predicate instead would silently widen the result set.
    #[error("filter not supported: {0}")]
    Unsupported(String),

    /// A configuration value is invalid or conflicting.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The requested table is not present in the supplied base metadata.
    #[error("table '{0}' not found in base metadata")]
    TableNotFound(String),

    /// An error reported by the remote-fetch collaborator.
    #[error(transparent)]
    Api(#[from] ApiError),
}
