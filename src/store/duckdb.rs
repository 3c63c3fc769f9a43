//! DuckDB-backed source and target store.

use super::{join_ids, IdQuery, SourceStore, TargetStore, Value, TIMESTAMP_FORMAT};
use crate::error::StoreError;
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::{params, AccessMode, Config, Connection};
use std::path::Path;

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A store over a single DuckDB connection
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    /// Open (or create) a database file for reading and writing
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::new(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self { conn })
    }

    /// Open an existing database file without write access
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(path, config).map_err(|e| {
            StoreError::new(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one or more statements, failing on the first error
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql).map_err(StoreError::from)
    }

    pub fn count_rows(&self, table: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| query_error(&sql, e))?;
        Ok(count.max(0) as u64)
    }
}

fn query_error(sql: &str, err: duckdb::Error) -> StoreError {
    StoreError::new(format!("Query failed: {}: {}", truncate(sql, 200), err))
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl SourceStore for DuckDbStore {
    fn column_names(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let sql = "SELECT column_name FROM information_schema.columns \
                   WHERE table_schema = current_schema() AND table_name = ? \
                   ORDER BY ordinal_position";
        let mut stmt = self.conn.prepare(sql).map_err(|e| query_error(sql, e))?;
        let names = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))
            .map_err(|e| query_error(sql, e))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn select_ids(&self, query: &IdQuery) -> Result<Vec<i64>, StoreError> {
        let sql = query.to_sql();
        let mut stmt = self.conn.prepare(&sql).map_err(|e| query_error(&sql, e))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| query_error(&sql, e))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn fetch_rows(
        &self,
        table: &str,
        columns: &[String],
        ids: &[i64],
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        if ids.is_empty() || columns.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE id IN ({}) ORDER BY id",
            columns.join(", "),
            table,
            join_ids(ids.iter())
        );
        let mut stmt = self.conn.prepare(&sql).map_err(|e| query_error(&sql, e))?;
        let mut rows = stmt.query([]).map_err(|e| query_error(&sql, e))?;

        let mut result = Vec::with_capacity(ids.len());
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(convert_value(row.get_ref(i)?)?);
            }
            result.push(values);
        }

        Ok(result)
    }
}

impl TargetStore for DuckDbStore {
    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql).map_err(StoreError::from)
    }
}

fn convert_value(value: ValueRef<'_>) -> Result<Value, StoreError> {
    let converted = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Int(n.into()),
        ValueRef::SmallInt(n) => Value::Int(n.into()),
        ValueRef::Int(n) => Value::Int(n.into()),
        ValueRef::BigInt(n) => Value::Int(n),
        ValueRef::HugeInt(n) => i64::try_from(n)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Decimal(n.to_string())),
        ValueRef::UTinyInt(n) => Value::Int(n.into()),
        ValueRef::USmallInt(n) => Value::Int(n.into()),
        ValueRef::UInt(n) => Value::Int(n.into()),
        ValueRef::UBigInt(n) => i64::try_from(n)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Decimal(n.to_string())),
        ValueRef::Float(f) => Value::Float(f64::from(f)),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => Value::Decimal(d.to_string()),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        ValueRef::Timestamp(unit, raw) => {
            let micros = to_micros(unit, raw);
            let secs = micros.div_euclid(1_000_000);
            let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
            match chrono::DateTime::from_timestamp(secs, nanos) {
                Some(dt) if nanos == 0 => Value::Timestamp(dt.format(TIMESTAMP_FORMAT).to_string()),
                Some(dt) => Value::Timestamp(dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
                None => return Err(out_of_range("timestamp", raw)),
            }
        }
        ValueRef::Date32(days) => {
            match chrono::NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAYS_FROM_CE + days) {
                Some(date) => Value::Date(date.format("%Y-%m-%d").to_string()),
                None => return Err(out_of_range("date", days.into())),
            }
        }
        ValueRef::Time64(unit, raw) => {
            let micros = to_micros(unit, raw);
            let time = u32::try_from(micros / 1_000_000).ok().and_then(|secs| {
                let nanos = ((micros % 1_000_000) * 1000) as u32;
                chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
            });
            match time {
                Some(time) => Value::Time(time.format("%H:%M:%S").to_string()),
                None => return Err(out_of_range("time", raw)),
            }
        }
        other => Value::Text(format!("{:?}", other)),
    };
    Ok(converted)
}

/// Scale a raw temporal value to microseconds
fn to_micros(unit: TimeUnit, raw: i64) -> i64 {
    match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw.div_euclid(1_000),
    }
}

fn out_of_range(kind: &str, raw: i64) -> StoreError {
    StoreError::new(format!("{} value {} is out of range", kind, raw))
}
