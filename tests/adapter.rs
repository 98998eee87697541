//! End-to-end adapter scenarios against a mock remote table API.

use std::cell::RefCell;

use indexmap::IndexMap;
use serde_json::json;

use airtable_adapter::adapter::TableAdapter;
use airtable_adapter::api::{ApiError, ApiResult, Pages, Record, TableApi};
use airtable_adapter::config::{BaseMetadata, ColumnMetadata, TableMetadata};
use airtable_adapter::fields::Cell;
use airtable_adapter::filter::{Filter, SortDirection};
use airtable_adapter::AdapterError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn record(id: &str, fields: serde_json::Value) -> Record {
    Record {
        id: id.to_string(),
        created_time: Some("2021-03-01T12:00:00.000Z".to_string()),
        fields: fields.as_object().expect("fields must be an object").clone(),
    }
}

/// Mock remote table: serves one set of records to the construction-time
/// peek, canned pages to queries, and records the pushdown arguments it
/// was called with.
#[derive(Debug)]
struct MockApi {
    sample: Vec<Record>,
    pages: Vec<Vec<Record>>,
    fail_after_pages: bool,
    pages_fetched: RefCell<usize>,
    last_sort: RefCell<Vec<String>>,
    last_formula: RefCell<Option<String>>,
}

impl MockApi {
    fn new(pages: Vec<Vec<Record>>) -> Self {
        Self {
            sample: pages.iter().flatten().cloned().collect(),
            pages,
            fail_after_pages: false,
            pages_fetched: RefCell::new(0),
            last_sort: RefCell::new(Vec::new()),
            last_formula: RefCell::new(None),
        }
    }

    /// Overrides the records seen by the construction-time peek.
    fn with_sample(mut self, sample: Vec<Record>) -> Self {
        self.sample = sample;
        self
    }

    fn pages_fetched(&self) -> usize {
        *self.pages_fetched.borrow()
    }
}

impl TableApi for MockApi {
    fn first(&self) -> ApiResult<Option<Record>> {
        Ok(self.sample.first().cloned())
    }

    fn all(&self, max_records: usize) -> ApiResult<Vec<Record>> {
        Ok(self.sample.iter().take(max_records).cloned().collect())
    }

    fn iterate(&self, sort: &[String], formula: Option<&str>) -> Pages<'_> {
        *self.last_sort.borrow_mut() = sort.to_vec();
        *self.last_formula.borrow_mut() = formula.map(str::to_string);

        let counter = &self.pages_fetched;
        let pages = self.pages.iter().map(move |page| {
            *counter.borrow_mut() += 1;
            Ok(page.clone())
        });
        if self.fail_after_pages {
            Box::new(pages.chain(std::iter::once(Err(ApiError::Request(
                "rate limited".to_string(),
            )))))
        } else {
            Box::new(pages)
        }
    }
}

fn base_metadata() -> BaseMetadata {
    let mut metadata = BaseMetadata::new();
    metadata.insert(
        "tblXXXX",
        TableMetadata {
            name: "name1".to_string(),
            columns: vec![ColumnMetadata {
                name: "col1".to_string(),
            }],
        },
    );
    metadata
}

fn collect_rows(adapter: &TableAdapter<&MockApi>) -> Vec<IndexMap<String, Cell>> {
    adapter
        .fetch(&IndexMap::new(), &[])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn test_strict_mode_schema_and_passthrough() {
    init_tracing();
    let api = MockApi::new(vec![vec![record(
        "rec1",
        json!({"col1": "v", "extra": 7}),
    )]]);
    let adapter = TableAdapter::with_metadata(&api, "name1", &base_metadata()).unwrap();
    assert!(adapter.is_strict());

    // Declared column plus the synthetic id and createdTime columns.
    let names: Vec<&str> = adapter.columns().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["col1", "id", "createdTime"]);
    assert_eq!(adapter.columns()["col1"].column_type.sql_type(), "TEXT");
    assert_eq!(
        adapter.columns()["createdTime"].column_type.sql_type(),
        "TIMESTAMP"
    );

    let rows = collect_rows(&adapter);
    assert_eq!(rows.len(), 1);

    // Metadata mode cannot know about undeclared remote fields, so they
    // pass through instead of being filtered.
    assert_eq!(rows[0]["col1"], Cell::Text("v".to_string()));
    assert_eq!(rows[0]["extra"], Cell::Int(7));
    assert_eq!(rows[0]["id"], Cell::Text("rec1".to_string()));
    assert_eq!(
        rows[0]["createdTime"],
        Cell::Text("2021-03-01T12:00:00.000Z".to_string())
    );
}

#[test]
fn test_strict_mode_unknown_table() {
    let api = MockApi::new(vec![]);
    let err = TableAdapter::with_metadata(&api, "nope", &base_metadata()).unwrap_err();
    assert!(matches!(err, AdapterError::TableNotFound(name) if name == "nope"));
}

#[test]
fn test_loose_mode_infers_and_drops_unknown_fields() {
    init_tracing();
    let api = MockApi::new(vec![vec![
        record("rec1", json!({"baz": 1})),
        record("rec2", json!({"baz": 2, "other": "x"})),
    ]]);
    let adapter = TableAdapter::with_sampling(&api, "tbl", 1, &[]).unwrap();
    assert!(!adapter.is_strict());

    // Single-row peek saw only "baz": schema is {baz: REAL, id: TEXT}.
    let names: Vec<&str> = adapter.columns().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["baz", "id"]);
    assert_eq!(adapter.columns()["baz"].column_type.sql_type(), "REAL");
    assert_eq!(adapter.columns()["id"].column_type.sql_type(), "TEXT");

    let rows = collect_rows(&adapter);
    assert_eq!(rows.len(), 2);

    // "other" was not part of the inferred schema and is dropped; no
    // createdTime column in loose mode.
    assert_eq!(rows[1]["baz"], Cell::Int(2));
    assert_eq!(rows[1]["id"], Cell::Text("rec2".to_string()));
    assert!(!rows[1].contains_key("other"));
    assert!(!rows[1].contains_key("createdTime"));
}

#[test]
fn test_multi_row_sampling() {
    // With peek_rows > 1, all sampled values feed inference: ints mixed
    // with a sentinel stay numeric.
    let api = MockApi::new(vec![vec![
        record("rec1", json!({"n": 1})),
        record("rec2", json!({"n": {"specialValue": "NaN"}})),
    ]]);
    let adapter = TableAdapter::with_sampling(&api, "tbl", 2, &[]).unwrap();
    assert_eq!(adapter.columns()["n"].column_type.sql_type(), "REAL");

    let rows = collect_rows(&adapter);
    assert!(matches!(rows[1]["n"], Cell::Float(f) if f.is_nan()));
}

#[test]
fn test_date_column_override() {
    let api = MockApi::new(vec![vec![record("rec1", json!({"when": 1}))]]);
    let adapter =
        TableAdapter::with_sampling(&api, "tbl", 1, &["when".to_string()]).unwrap();
    assert_eq!(adapter.columns()["when"].column_type.sql_type(), "TIMESTAMP");
}

#[test]
fn test_pushdown_translation() {
    init_tracing();
    let api = MockApi::new(vec![vec![record("rec1", json!({"baz": 1}))]]);
    let adapter = TableAdapter::with_sampling(&api, "tbl", 1, &[]).unwrap();

    let mut bounds = IndexMap::new();
    bounds.insert("baz".to_string(), Filter::Equal { value: 33i64.into() });
    let order = vec![
        ("a".to_string(), SortDirection::Ascending),
        ("b".to_string(), SortDirection::Descending),
    ];

    // Force the fetch so the mock records its arguments.
    let _ = adapter.fetch(&bounds, &order).unwrap().count();

    assert_eq!(
        *api.last_sort.borrow(),
        vec!["a".to_string(), "-b".to_string()]
    );
    assert_eq!(api.last_formula.borrow().as_deref(), Some("{baz}=33"));
}

#[test]
fn test_unfiltered_fetch_has_no_formula() {
    let api = MockApi::new(vec![vec![record("rec1", json!({"baz": 1}))]]);
    let adapter = TableAdapter::with_sampling(&api, "tbl", 1, &[]).unwrap();

    let _ = adapter.fetch(&IndexMap::new(), &[]).unwrap().count();

    assert!(api.last_sort.borrow().is_empty());
    assert_eq!(*api.last_formula.borrow(), None);
}

#[test]
fn test_pages_fetched_lazily() {
    let api = MockApi::new(vec![
        vec![record("rec1", json!({"baz": 1}))],
        vec![record("rec2", json!({"baz": 2}))],
    ]);
    let adapter = TableAdapter::with_sampling(&api, "tbl", 1, &[]).unwrap();

    let mut rows = adapter.fetch(&IndexMap::new(), &[]).unwrap();
    assert_eq!(api.pages_fetched(), 0);

    let first = rows.next().unwrap().unwrap();
    assert_eq!(first["id"], Cell::Text("rec1".to_string()));
    assert_eq!(api.pages_fetched(), 1);

    let second = rows.next().unwrap().unwrap();
    assert_eq!(second["id"], Cell::Text("rec2".to_string()));
    assert_eq!(api.pages_fetched(), 2);

    assert!(rows.next().is_none());
}

#[test]
fn test_coercion_failure_names_field() {
    // Inference saw a number; the full fetch later returns a string.
    let api = MockApi::new(vec![vec![record(
        "rec2",
        json!({"baz": "not a number"}),
    )]])
    .with_sample(vec![record("rec1", json!({"baz": 1}))]);
    let adapter = TableAdapter::with_sampling(&api, "tbl", 1, &[]).unwrap();

    let mut rows = adapter.fetch(&IndexMap::new(), &[]).unwrap();
    let err = rows.next().unwrap().unwrap_err();
    assert!(matches!(err, AdapterError::Coerce { ref field, .. } if field == "baz"));
    assert!(err.to_string().contains("field 'baz'"));
}

#[test]
fn test_api_error_surfaces_mid_stream() {
    let mut api = MockApi::new(vec![vec![record("rec1", json!({"baz": 1}))]]);
    api.fail_after_pages = true;
    let adapter = TableAdapter::with_sampling(&api, "tbl", 1, &[]).unwrap();

    let mut rows = adapter.fetch(&IndexMap::new(), &[]).unwrap();
    assert!(rows.next().unwrap().is_ok());
    let err = rows.next().unwrap().unwrap_err();
    assert!(matches!(err, AdapterError::Api(_)));
    assert!(err.to_string().contains("rate limited"));
}
