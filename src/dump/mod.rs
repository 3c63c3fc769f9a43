//! Dump serialization: one multi-row INSERT per selected table, followed by
//! post-load sequence adjustments.
//!
//! The output is line-oriented so the restore replayer can split it on
//! statement terminators:
//!
//! ```sql
//! -- Lightweight Database Dump
//! -- Generated by devdb
//! -- 2024-06-30 12:00:00 UTC
//!
//! -- Data for table: users
//! INSERT INTO users (id, email) VALUES (1, 'user1a2b3c@dev.local'),
//! (2, 'user4d5e6f@dev.local');
//!
//! -- Post-load sequence adjustments
//! ALTER TABLE users AUTO_INCREMENT = 100000;
//! ```

pub mod manifest;

pub use manifest::{Manifest, MaxRowsBound, TableManifest};

use crate::anonymize::Transformer;
use crate::dialect::SqlDialect;
use crate::error::{Error, Result, StoreError};
use crate::spec::{DatabaseSpec, TableRule};
use crate::store::{SourceStore, Value};
use crate::subset::{processing_order, Registry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

pub const DUMP_FILE_NAME: &str = "lightweight-dump.sql";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Ids per row fetch
pub const FETCH_CHUNK_SIZE: usize = 1000;

/// Pseudo-columns some engines report for every table
pub const SYSTEM_COLUMNS: &[&str] = &[
    "USER",
    "CURRENT_CONNECTIONS",
    "TOTAL_CONNECTIONS",
    "MAX_SESSION_CONTROLLED_MEMORY",
    "MAX_SESSION_TOTAL_MEMORY",
];

pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// SQL literal for a transformed value.
///
/// Non-finite floats have no literal form and are written as `NULL`.
pub fn render_value(value: &Value, dialect: SqlDialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Float(_) => "NULL".to_string(),
        Value::Decimal(d) => d.clone(),
        Value::Text(s) => dialect.quote_text(s),
        Value::Blob(b) => dialect.blob_literal(b),
        Value::Date(s) | Value::Time(s) | Value::Timestamp(s) => format!("'{}'", s),
    }
}

/// Counters for one dump
#[derive(Debug, Default, Clone, Serialize)]
pub struct DumpStats {
    pub tables_written: usize,
    pub rows_written: u64,
    pub sequence_adjustments: usize,
    pub bytes_written: u64,
}

/// Renders the dump for a finished selection
pub struct DumpWriter<'a> {
    spec: &'a DatabaseSpec,
    dialect: SqlDialect,
    chunk_size: usize,
}

impl<'a> DumpWriter<'a> {
    pub fn new(spec: &'a DatabaseSpec, dialect: SqlDialect) -> Self {
        Self {
            spec,
            dialect,
            chunk_size: FETCH_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Write the whole dump to `out`
    pub fn write_dump<S: SourceStore + ?Sized, W: Write>(
        &self,
        registry: &Registry,
        source: &S,
        out: &mut W,
        generated_at: DateTime<Utc>,
    ) -> Result<DumpStats> {
        let mut stats = DumpStats::default();

        let header = format!(
            "-- Lightweight Database Dump\n-- Generated by devdb\n-- {}\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        emit(out, &header, &mut stats)?;

        for table in processing_order(self.spec) {
            let Some(ids) = registry.get(&table.name).filter(|ids| !ids.is_empty()) else {
                continue;
            };

            let (insert, rows) = self.render_table(table, ids, source)?;
            if rows == 0 {
                continue;
            }

            emit(out, &format!("-- Data for table: {}\n", table.name), &mut stats)?;
            emit(out, &insert, &mut stats)?;
            emit(out, "\n\n", &mut stats)?;

            tracing::debug!("Wrote {} rows for {}", rows, table.name);
            stats.tables_written += 1;
            stats.rows_written += rows;
        }

        emit(out, "-- Post-load sequence adjustments\n", &mut stats)?;
        for statement in self.sequence_statements() {
            emit(out, &statement, &mut stats)?;
            emit(out, "\n", &mut stats)?;
            stats.sequence_adjustments += 1;
        }

        out.flush()?;
        Ok(stats)
    }

    /// INSERT statement for the selected rows of one table, with its row count
    pub fn render_table<S: SourceStore + ?Sized>(
        &self,
        table: &TableRule,
        ids: &BTreeSet<i64>,
        source: &S,
    ) -> Result<(String, u64)> {
        let columns: Vec<String> = source
            .column_names(&table.name)?
            .into_iter()
            .filter(|c| !is_system_column(c))
            .collect();
        if columns.is_empty() {
            return Err(Error::Store(StoreError::new(format!(
                "Table '{}' has no columns in the source",
                table.name
            ))));
        }

        let transformer = Transformer::new(&self.spec.defaults.masking);
        let rules: Vec<_> = columns.iter().map(|c| table.column(c)).collect();
        let ids: Vec<i64> = ids.iter().copied().collect();

        let mut rendered_rows = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.chunk_size) {
            for row in source.fetch_rows(&table.name, &columns, chunk)? {
                let values: Vec<String> = row
                    .iter()
                    .zip(&rules)
                    .map(|(value, rule)| {
                        render_value(&transformer.transform(*rule, value), self.dialect)
                    })
                    .collect();
                rendered_rows.push(format!("({})", values.join(", ")));
            }
        }

        let insert = format!(
            "INSERT INTO {} ({}) VALUES {};",
            table.name,
            columns.join(", "),
            rendered_rows.join(",\n")
        );
        Ok((insert, rendered_rows.len() as u64))
    }

    /// Sequence statements for tables with a `sequence_offset`, in processing order
    pub fn sequence_statements(&self) -> Vec<String> {
        processing_order(self.spec)
            .into_iter()
            .filter_map(|t| {
                t.sequence_offset()
                    .map(|offset| self.dialect.sequence_adjustment(&t.name, offset))
            })
            .collect()
    }
}

fn emit<W: Write>(out: &mut W, text: &str, stats: &mut DumpStats) -> Result<()> {
    out.write_all(text.as_bytes())?;
    stats.bytes_written += text.len() as u64;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::FakeSource;
    use chrono::TimeZone;

    const SPEC: &str = r#"
defaults:
  masking:
    deterministic_salt: s
tables:
  users:
    processing_order: 1
    subset: { strategy: all, root: true }
    post_load: { sequence_offset: 100000 }
    columns:
      name: { strategy: mask, mask: { type: username } }
  orders:
    processing_order: 2
    subset: { strategy: fk_closure }
    post_load: { sequence_offset: 500 }
    fk:
      references:
        - { column: user_id, table: users }
  empty:
    processing_order: 3
    subset: { strategy: all }
"#;

    fn source() -> FakeSource {
        FakeSource::default()
            .with_table(
                "users",
                &["id", "name", "USER", "active"],
                vec![
                    vec![Value::Int(2), Value::text("bob"), Value::text("root"), Value::Bool(false)],
                    vec![Value::Int(1), Value::text("alice"), Value::text("root"), Value::Bool(true)],
                ],
            )
            .with_table(
                "orders",
                &["id", "user_id", "note"],
                vec![vec![Value::Int(10), Value::Int(1), Value::text("it's fine")]],
            )
            .with_table("empty", &["id"], vec![])
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert("users", [1, 2].into_iter().collect());
        registry.insert("orders", [10].into_iter().collect());
        registry.insert("empty", BTreeSet::new());
        registry
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_render_value() {
        let render = |v: &Value| render_value(v, SqlDialect::MySql);
        assert_eq!(render(&Value::Null), "NULL");
        assert_eq!(render(&Value::text("O'Brien")), "'O''Brien'");
        assert_eq!(render(&Value::Bool(true)), "1");
        assert_eq!(render(&Value::Bool(false)), "0");
        assert_eq!(render(&Value::Int(-3)), "-3");
        assert_eq!(render(&Value::Float(105.0)), "105");
        assert_eq!(render(&Value::Float(1.25)), "1.25");
        assert_eq!(render(&Value::Decimal("9.90".to_string())), "9.90");
        assert_eq!(
            render(&Value::Timestamp("2024-01-01 10:00:00".to_string())),
            "'2024-01-01 10:00:00'"
        );
        assert_eq!(render(&Value::Date("2024-01-01".to_string())), "'2024-01-01'");
        assert_eq!(render(&Value::Blob(vec![0xca, 0xfe])), "X'cafe'");
    }

    #[test]
    fn test_non_finite_floats_render_as_null() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(render_value(&Value::Float(f), SqlDialect::Postgres), "NULL");
        }
    }

    #[test]
    fn test_multi_line_text_keeps_insert_on_statement_lines() {
        let spec = DatabaseSpec::from_yaml_str("tables:\n  notes:\n    subset: { strategy: all }\n")
            .unwrap();
        let source = FakeSource::default().with_table(
            "notes",
            &["id", "body"],
            vec![
                vec![Value::Int(1), Value::text("a;\nb")],
                vec![Value::Int(2), Value::text("x")],
            ],
        );
        let ids: BTreeSet<i64> = [1, 2].into_iter().collect();
        let writer = DumpWriter::new(&spec, SqlDialect::Postgres);
        let (insert, rows) = writer
            .render_table(spec.table("notes").unwrap(), &ids, &source)
            .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            insert,
            "INSERT INTO notes (id, body) VALUES (1, 'a;' || chr(10) || 'b'),\n(2, 'x');"
        );
        // only the final line may end a statement
        let lines: Vec<&str> = insert.lines().collect();
        assert!(lines[..lines.len() - 1].iter().all(|l| !l.ends_with(';')));
    }

    #[test]
    fn test_system_columns_case_insensitive() {
        assert!(is_system_column("USER"));
        assert!(is_system_column("user"));
        assert!(is_system_column("Max_Session_Total_Memory"));
        assert!(!is_system_column("username"));
    }

    #[test]
    fn test_write_dump_layout() {
        let spec = DatabaseSpec::from_yaml_str(SPEC).unwrap();
        let writer = DumpWriter::new(&spec, SqlDialect::MySql);
        let mut out = Vec::new();
        let stats = writer
            .write_dump(&registry(), &source(), &mut out, generated_at())
            .unwrap();
        let dump = String::from_utf8(out).unwrap();

        let expected = "-- Lightweight Database Dump\n\
-- Generated by devdb\n\
-- 2024-06-30 12:00:00 UTC\n\
\n\
-- Data for table: users\n\
INSERT INTO users (id, name, active) VALUES (1, 'user_5a4427a7', 1),\n\
(2, 'user_"
            .to_string();
        assert!(dump.starts_with(&expected), "{}", dump);
        assert!(dump.contains(
            "-- Data for table: orders\nINSERT INTO orders (id, user_id, note) VALUES (10, 1, 'it''s fine');\n\n"
        ));
        assert!(!dump.contains("Data for table: empty"));
        assert!(dump.ends_with(
            "-- Post-load sequence adjustments\nALTER TABLE users AUTO_INCREMENT = 100000;\nALTER TABLE orders AUTO_INCREMENT = 500;\n"
        ));

        assert_eq!(stats.tables_written, 2);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.sequence_adjustments, 2);
        assert_eq!(stats.bytes_written as usize, dump.len());
    }

    #[test]
    fn test_write_dump_is_deterministic() {
        let spec = DatabaseSpec::from_yaml_str(SPEC).unwrap();
        let writer = DumpWriter::new(&spec, SqlDialect::Postgres);
        let mut first = Vec::new();
        let mut second = Vec::new();
        writer
            .write_dump(&registry(), &source(), &mut first, generated_at())
            .unwrap();
        writer
            .write_dump(&registry(), &source(), &mut second, generated_at())
            .unwrap();
        assert_eq!(first, second);
        assert!(String::from_utf8(first)
            .unwrap()
            .contains("SELECT setval(pg_get_serial_sequence('users', 'id'), 100000, false);"));
    }

    #[test]
    fn test_chunked_fetch_keeps_single_insert() {
        let spec = DatabaseSpec::from_yaml_str(SPEC).unwrap();
        let writer = DumpWriter::new(&spec, SqlDialect::MySql).with_chunk_size(1);
        let (insert, rows) = writer
            .render_table(
                spec.table("users").unwrap(),
                &[1, 2].into_iter().collect(),
                &source(),
            )
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(insert.matches("INSERT INTO").count(), 1);
        assert!(insert.contains("),\n("));
        assert!(insert.ends_with(");"));
    }

    #[test]
    fn test_table_without_columns_is_error() {
        let spec = DatabaseSpec::from_yaml_str(SPEC).unwrap();
        let writer = DumpWriter::new(&spec, SqlDialect::MySql);
        let source = FakeSource::default().with_table("users", &["USER"], vec![]);
        let result = writer.render_table(
            spec.table("users").unwrap(),
            &[1].into_iter().collect(),
            &source,
        );
        assert!(matches!(result, Err(Error::Store(_))));
    }
}
