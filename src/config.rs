//! Connection configuration and base metadata.
//!
//! Provides [`ConnectionConfig`] parsed from an `airtable://` URI and the
//! read-only [`BaseMetadata`] mapping that, when supplied, switches the
//! adapter into strict (metadata-driven) schema resolution.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{AdapterError, AdapterResult};

/// URI scheme accepted by [`ConnectionConfig::parse_uri`].
pub const URI_SCHEME: &str = "airtable";

/// Default sampling depth for loose-mode schema inference.
const fn default_peek_rows() -> usize {
    1
}

/// One column declaration in table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column (field) name.
    pub name: String,
}

/// Externally supplied metadata for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Display name used to resolve the table.
    pub name: String,
    /// Declared columns.
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

/// Ordered, read-only mapping of table identifier → table metadata.
///
/// Owned by the connection configuration and passed by reference into
/// adapter construction; never mutated after initial load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseMetadata {
    tables: IndexMap<String, TableMetadata>,
}

impl BaseMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table declaration (construction-time only).
    pub fn insert(&mut self, table_id: impl Into<String>, table: TableMetadata) {
        self.tables.insert(table_id.into(), table);
    }

    /// Looks a table up by display name.
    #[must_use]
    pub fn find_table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.values().find(|table| table.name == name)
    }

    /// Display names of all declared tables, in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|table| table.name.as_str())
    }

    /// Number of declared tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no tables are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Connection settings parsed from an `airtable://` URI.
///
/// The URI carries the API key as the password component and the base
/// identifier as the host:
///
/// ```text
/// airtable://:keyXXXX@appYYYY?tables=Orders&tables=Items&peek_rows=3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Airtable API key.
    pub api_key: String,

    /// Base identifier.
    pub base_id: String,

    /// Explicit table-name enumeration, overriding metadata when
    /// non-empty. Repeatable in the URI.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Sampling depth for loose-mode schema inference (default 1).
    #[serde(default = "default_peek_rows")]
    pub peek_rows: usize,
}

impl ConnectionConfig {
    /// Parses a connection URI carrying the API key inline.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Config`] for a malformed URI, a missing
    /// credential or base id, or an invalid `peek_rows` value.
    pub fn parse_uri(uri: &str) -> AdapterResult<Self> {
        Self::parse_uri_with_key(uri, None)
    }

    /// Parses a connection URI, optionally supplying the API key
    /// out-of-band.
    ///
    /// Supplying both an inline URI credential and `configured_key` is a
    /// configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Config`] for a malformed URI, conflicting
    /// or missing credentials, a missing base id, or an invalid
    /// `peek_rows` value.
    pub fn parse_uri_with_key(uri: &str, configured_key: Option<&str>) -> AdapterResult<Self> {
        let url = Url::parse(uri)
            .map_err(|e| AdapterError::Config(format!("invalid connection URI: {e}")))?;

        if url.scheme() != URI_SCHEME {
            return Err(AdapterError::Config(format!(
                "unexpected URI scheme '{}', expected '{URI_SCHEME}'",
                url.scheme()
            )));
        }

        let inline_key = url.password().filter(|p| !p.is_empty());
        let api_key = match (inline_key, configured_key) {
            (Some(_), Some(_)) => {
                return Err(AdapterError::Config(
                    "both an inline URI credential and a configured API key were provided".into(),
                ))
            }
            (Some(key), None) | (None, Some(key)) => key.to_string(),
            (None, None) => {
                return Err(AdapterError::Config("no API key provided".into()));
            }
        };

        let base_id = url
            .host_str()
            .ok_or_else(|| AdapterError::Config("missing base id in URI host".into()))?
            .to_string();

        let mut tables = Vec::new();
        let mut peek_rows = default_peek_rows();
        for (key, value) in url.query_pairs() {
            match &*key {
                "tables" => tables.push(value.into_owned()),
                // Last value wins on duplicates.
                "peek_rows" => {
                    peek_rows = value.parse().map_err(|_| {
                        AdapterError::Config(format!(
                            "peek_rows should be an integer, got '{value}'"
                        ))
                    })?;
                }
                other => debug!(param = other, "ignoring unknown URI query parameter"),
            }
        }
        if peek_rows == 0 {
            return Err(AdapterError::Config("peek_rows must be at least 1".into()));
        }

        Ok(Self {
            api_key,
            base_id,
            tables,
            peek_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_basic() {
        let config = ConnectionConfig::parse_uri("airtable://:keyXXXX@appYYYY").unwrap();
        assert_eq!(config.api_key, "keyXXXX");
        assert_eq!(config.base_id, "appYYYY");
        assert!(config.tables.is_empty());
        assert_eq!(config.peek_rows, 1);
    }

    #[test]
    fn test_parse_uri_query_params() {
        let config = ConnectionConfig::parse_uri(
            "airtable://:k@app?tables=Orders&tables=Items&peek_rows=3",
        )
        .unwrap();
        assert_eq!(config.tables, vec!["Orders", "Items"]);
        assert_eq!(config.peek_rows, 3);
    }

    #[test]
    fn test_parse_uri_peek_rows_last_wins() {
        let config =
            ConnectionConfig::parse_uri("airtable://:k@app?peek_rows=2&peek_rows=5").unwrap();
        assert_eq!(config.peek_rows, 5);
    }

    #[test]
    fn test_parse_uri_bad_peek_rows() {
        let err =
            ConnectionConfig::parse_uri("airtable://:k@app?peek_rows=lots").unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
        assert!(err.to_string().contains("peek_rows"));

        let err = ConnectionConfig::parse_uri("airtable://:k@app?peek_rows=0").unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_parse_uri_credential_conflict() {
        let err =
            ConnectionConfig::parse_uri_with_key("airtable://:inline@app", Some("configured"))
                .unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_parse_uri_configured_key() {
        let config =
            ConnectionConfig::parse_uri_with_key("airtable://app", Some("keyZZZZ")).unwrap();
        assert_eq!(config.api_key, "keyZZZZ");
        assert_eq!(config.base_id, "app");
    }

    #[test]
    fn test_parse_uri_missing_key() {
        let err = ConnectionConfig::parse_uri("airtable://app").unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[test]
    fn test_parse_uri_wrong_scheme() {
        let err = ConnectionConfig::parse_uri("postgres://:k@app").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_base_metadata_lookup() {
        let mut metadata = BaseMetadata::new();
        metadata.insert(
            "tbl1",
            TableMetadata {
                name: "name1".into(),
                columns: vec![ColumnMetadata { name: "col1".into() }],
            },
        );
        metadata.insert(
            "tbl2",
            TableMetadata {
                name: "name2".into(),
                columns: vec![],
            },
        );

        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.table_names().collect::<Vec<_>>(),
            vec!["name1", "name2"]
        );
        assert_eq!(metadata.find_table("name2").unwrap().name, "name2");
        assert!(metadata.find_table("nope").is_none());
    }

    #[test]
    fn test_base_metadata_deserializes() {
        let metadata: BaseMetadata = serde_json::from_str(
            r#"{"tbl1": {"name": "name1", "columns": [{"name": "col1"}]}}"#,
        )
        .unwrap();
        assert_eq!(metadata.find_table("name1").unwrap().columns.len(), 1);
    }
}
