//! Store interfaces used by selection, serialization and restore.
//!
//! The engine never talks to a database driver directly. Selection and dump
//! rendering go through [`SourceStore`]; restore goes through [`TargetStore`].
//! [`DuckDbStore`] implements both.

mod duckdb;

pub use self::duckdb::DuckDbStore;

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Timestamp format used for temporal literals and values
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell read from the source store
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact numeric kept in its textual form
    Decimal(String),
    Text(String),
    /// Raw bytes; stringified as lowercase hex
    Blob(Vec<u8>),
    Date(String),
    Time(String),
    Timestamp(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.parse().ok(),
            _ => None,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

/// Textual form of a value, as fed to the digest
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Blob(b) => write!(f, "{}", hex::encode(b)),
            Value::Decimal(s)
            | Value::Text(s)
            | Value::Date(s)
            | Value::Time(s)
            | Value::Timestamp(s) => write!(f, "{}", s),
        }
    }
}

/// Row restriction for an id query
#[derive(Debug, Clone, PartialEq)]
pub enum IdFilter {
    /// `created_at >= cutoff`
    CreatedSince(DateTime<Utc>),
    /// `column IN (ids)`
    ColumnIn { column: String, ids: BTreeSet<i64> },
}

/// Query returning the `id` column of matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct IdQuery {
    pub table: String,
    pub filter: Option<IdFilter>,
    pub order_by: String,
    pub limit: Option<u64>,
}

impl IdQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            order_by: "id".to_string(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: IdFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = column.into();
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Render as a SELECT. Names are expected to be validated identifiers.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT id FROM {}", self.table);

        match &self.filter {
            Some(IdFilter::CreatedSince(cutoff)) => {
                sql.push_str(&format!(
                    " WHERE created_at >= TIMESTAMP '{}'",
                    cutoff.format(TIMESTAMP_FORMAT)
                ));
            }
            Some(IdFilter::ColumnIn { column, ids }) => {
                sql.push_str(&format!(" WHERE {} IN ({})", column, join_ids(ids.iter())));
            }
            None => {}
        }

        sql.push_str(&format!(" ORDER BY {}", self.order_by));

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

/// Comma-separated id list for an `IN (...)` clause
pub fn join_ids<'a>(ids: impl Iterator<Item = &'a i64>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

/// Read-only access to the production copy
pub trait SourceStore {
    /// Column names of `table` in declaration order
    fn column_names(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Ids of rows matching `query`
    fn select_ids(&self, query: &IdQuery) -> Result<Vec<i64>, StoreError>;

    /// Rows of `table` with the given ids, ordered by id, cells in `columns` order
    fn fetch_rows(
        &self,
        table: &str,
        columns: &[String],
        ids: &[i64],
    ) -> Result<Vec<Vec<Value>>, StoreError>;
}

/// Write access to the database a dump is replayed into
pub trait TargetStore {
    /// Execute one statement
    fn execute(&mut self, sql: &str) -> Result<(), StoreError>;
}
