//! # Airtable adapter
//!
//! A SQL-queryable adapter that exposes an Airtable base's tables as if
//! they were relational tables. Given a table name it discovers or
//! guesses a column schema, translates SQL predicates and sort orders
//! into Airtable's formula language, and streams rows back unbuffered,
//! one record at a time.
//!
//! The crate is the adapter core only: the SQL host framework and the
//! wire-level Airtable client plug in through the [`api::TableApi`]
//! trait and the [`filter`] contract types.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Table adapter orchestration and the lazy row stream.
pub mod adapter;

/// Remote-fetch collaborator contract.
pub mod api;

/// Connection-string parsing and base metadata.
pub mod config;

/// Crate-level error types.
pub mod error;

/// Value coercion strategies for remote field values.
pub mod fields;

/// Filter and sort types consumed from the host query framework.
pub mod filter;

/// Filter-to-formula translation.
pub mod formula;

/// Schema inference from sampled field values.
pub mod infer;

pub use adapter::{ColumnSchema, Row, Rows, TableAdapter};
pub use error::{AdapterError, AdapterResult};
