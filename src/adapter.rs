//! Table adapter orchestration.
//!
//! [`TableAdapter`] wires the pieces together: it resolves a column
//! schema at construction (from supplied base metadata in strict mode, or
//! by sampling rows in loose mode), translates the host's bounds and sort
//! order into Airtable's formula and sort syntax, and streams coerced
//! rows one page at a time.
//!
//! An adapter is immutable once constructed and exclusively owned by one
//! query execution context; no locking is involved.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::api::{Pages, Record, TableApi, CREATED_TIME_COLUMN, ID_COLUMN};
use crate::config::BaseMetadata;
use crate::error::{AdapterError, AdapterResult};
use crate::fields::{Cell, Coercion};
use crate::filter::{Filter, FilterKind, SortDirection};
use crate::formula::{bounds_formula, TranslateOptions};
use crate::infer::{guess_field, ColumnType, FieldGuess};

/// Filter kinds every column advertises for pushdown.
pub const SUPPORTED_FILTER_OPS: &[FilterKind] = &[
    FilterKind::IsNull,
    FilterKind::IsNotNull,
    FilterKind::Range,
    FilterKind::Equal,
    FilterKind::NotEqual,
];

/// One column of the resolved schema: a coercion strategy plus the
/// declared type and supported filter operators.
///
/// Created once at adapter construction, immutable thereafter.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    /// Strategy applied to this column's raw values.
    pub coercion: Coercion,
    /// Declared SQL-visible type.
    pub column_type: ColumnType,
    /// Filter kinds the column supports for pushdown.
    pub filter_ops: &'static [FilterKind],
    /// Whether pushed-down filters are exact (no post-filtering needed).
    pub exact: bool,
}

impl ColumnSchema {
    fn new(coercion: Coercion, column_type: ColumnType) -> Self {
        Self {
            coercion,
            column_type,
            filter_ops: SUPPORTED_FILTER_OPS,
            exact: true,
        }
    }
}

/// One streamed record: coerced fields plus the identifier (and, in
/// strict mode, the creation timestamp) appended.
pub type Row = IndexMap<String, Cell>;

/// SQL-queryable view over one remote table.
#[derive(Debug)]
pub struct TableAdapter<A: TableApi> {
    api: A,
    table: String,
    strict: bool,
    columns: IndexMap<String, ColumnSchema>,
    options: TranslateOptions,
}

impl<A: TableApi> TableAdapter<A> {
    /// Builds an adapter in strict mode from supplied base metadata.
    ///
    /// The table is resolved by display name; all declared fields are
    /// typed with the lenient string-or-list strategy regardless of
    /// observed data, and fetched records are not filtered to the
    /// declared set.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::TableNotFound`] if `table` is not declared
    /// in `metadata`.
    pub fn with_metadata(
        api: A,
        table: impl Into<String>,
        metadata: &BaseMetadata,
    ) -> AdapterResult<Self> {
        let table = table.into();
        let table_metadata = metadata
            .find_table(&table)
            .ok_or_else(|| AdapterError::TableNotFound(table.clone()))?;

        let mut columns = IndexMap::with_capacity(table_metadata.columns.len() + 2);
        for column in &table_metadata.columns {
            columns.insert(
                column.name.clone(),
                ColumnSchema::new(Coercion::maybe_list_string(), ColumnType::Text),
            );
        }
        columns.insert(
            ID_COLUMN.to_string(),
            ColumnSchema::new(Coercion::Scalar, ColumnType::Text),
        );
        columns.insert(
            CREATED_TIME_COLUMN.to_string(),
            ColumnSchema::new(Coercion::Scalar, ColumnType::Timestamp),
        );
        debug!(
            table = %table,
            columns = columns.len(),
            "resolved schema from base metadata"
        );

        Ok(Self {
            api,
            table,
            strict: true,
            columns,
            options: TranslateOptions::default(),
        })
    }

    /// Builds an adapter in loose mode by sampling up to `peek_rows`
    /// rows and inferring a schema from the observed values.
    ///
    /// Fields named in `date_columns` bypass inference and are typed as
    /// ISO-8601 timestamps. A `peek_rows` of 1 uses the cheaper
    /// single-row peek.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Api`] if the sampling fetch fails.
    pub fn with_sampling(
        api: A,
        table: impl Into<String>,
        peek_rows: usize,
        date_columns: &[String],
    ) -> AdapterResult<Self> {
        let table = table.into();

        let mut samples: IndexMap<String, Vec<Value>> = IndexMap::new();
        if peek_rows <= 1 {
            if let Some(record) = api.first()? {
                for (name, value) in record.fields {
                    samples.entry(name).or_default().push(value);
                }
            }
        } else {
            for record in api.all(peek_rows)? {
                for (name, value) in record.fields {
                    samples.entry(name).or_default().push(value);
                }
            }
        }
        debug!(
            table = %table,
            fields = samples.len(),
            peek_rows,
            "sampled rows for schema inference"
        );

        let mut columns = IndexMap::with_capacity(samples.len() + 1);
        for (name, values) in &samples {
            let guess = if date_columns.iter().any(|c| c == name) {
                FieldGuess {
                    coercion: Coercion::MaybeList {
                        item: Box::new(Coercion::Scalar),
                        allow_multiple: false,
                    },
                    column_type: ColumnType::Timestamp,
                }
            } else {
                guess_field(values)
            };
            columns.insert(
                name.clone(),
                ColumnSchema::new(guess.coercion, guess.column_type),
            );
        }
        columns.insert(
            ID_COLUMN.to_string(),
            ColumnSchema::new(Coercion::Scalar, ColumnType::Text),
        );

        Ok(Self {
            api,
            table,
            strict: false,
            columns,
            options: TranslateOptions::default(),
        })
    }

    /// Overrides the default formula translation options.
    #[must_use]
    pub fn with_translate_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    /// The adapted table's name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns `true` in metadata-driven (strict) mode.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The resolved column schema, in declaration/observation order.
    #[must_use]
    pub fn columns(&self) -> &IndexMap<String, ColumnSchema> {
        &self.columns
    }

    /// Streams rows matching `bounds`, ordered by `order`.
    ///
    /// Bounds are translated to an Airtable formula and the order to the
    /// remote sort syntax before the fetch; both execute server-side.
    /// The returned stream is finite, non-restartable, and lazy: each
    /// page is fetched only as the consumer advances.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unsupported`] if a filter has no formula
    /// translation. Fetch and coercion failures surface through the
    /// returned iterator's items.
    pub fn fetch(
        &self,
        bounds: &IndexMap<String, Filter>,
        order: &[(String, SortDirection)],
    ) -> AdapterResult<Rows<'_>> {
        let sort = sort_expressions(order);
        let formula = bounds_formula(bounds, self.options)?;
        debug!(
            table = %self.table,
            formula = formula.as_deref().unwrap_or(""),
            sort = ?sort,
            "fetching rows"
        );

        let pages = self.api.iterate(&sort, formula.as_deref());
        Ok(Rows {
            columns: &self.columns,
            strict: self.strict,
            lenient: Coercion::maybe_list_string(),
            pages,
            current: Vec::new().into_iter(),
        })
    }
}

/// Translates a requested sort order into the remote sort syntax:
/// ascending columns pass through, descending columns gain a leading `-`.
#[must_use]
pub fn sort_expressions(order: &[(String, SortDirection)]) -> Vec<String> {
    order
        .iter()
        .map(|(column, direction)| match direction {
            SortDirection::Ascending => column.clone(),
            SortDirection::Descending => format!("-{column}"),
        })
        .collect()
}

/// Lazy row stream returned by [`TableAdapter::fetch`].
///
/// Pulls one page at a time from the remote API; advancing past the last
/// record of a page is the only suspension point that blocks on the
/// network.
pub struct Rows<'a> {
    columns: &'a IndexMap<String, ColumnSchema>,
    strict: bool,
    lenient: Coercion,
    pages: Pages<'a>,
    current: std::vec::IntoIter<Record>,
}

impl Rows<'_> {
    fn coerce_record(&self, record: Record) -> AdapterResult<Row> {
        let mut row = Row::with_capacity(record.fields.len() + 2);
        for (name, value) in record.fields {
            let schema = self.columns.get(&name);
            let coercion = if self.strict {
                // Strict mode cannot know about fields absent from the
                // declared list, so everything passes through leniently.
                schema.map_or(&self.lenient, |s| &s.coercion)
            } else if let Some(schema) = schema {
                &schema.coercion
            } else {
                // Loose mode keeps only inferred columns.
                continue;
            };
            let cell = coercion
                .parse(Some(&value))
                .map_err(|source| AdapterError::Coerce {
                    field: name.clone(),
                    source,
                })?;
            row.insert(name, cell);
        }
        row.insert(ID_COLUMN.to_string(), Cell::Text(record.id));
        if self.strict {
            row.insert(
                CREATED_TIME_COLUMN.to_string(),
                record.created_time.map_or(Cell::Null, Cell::Text),
            );
        }
        Ok(row)
    }
}

impl Iterator for Rows<'_> {
    type Item = AdapterResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.next() {
                return Some(self.coerce_record(record));
            }
            match self.pages.next()? {
                Ok(page) => {
                    trace!(records = page.len(), "fetched page");
                    self.current = page.into_iter();
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
