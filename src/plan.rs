//! Dry-run plan: what a generate run would do, without touching a store.

use crate::dump::MaxRowsBound;
use crate::error::Result;
use crate::spec::{ColumnRule, ColumnStrategy, DatabaseSpec, TableRule};
use crate::subset::processing_order;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnPlan {
    pub name: String,
    pub sensitivity: Option<String>,
    pub strategy: String,
    /// Mask or synth type, when the strategy uses one
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TablePlan {
    pub name: String,
    pub processing_order: i32,
    pub root: bool,
    pub strategy: Option<String>,
    pub max_rows: MaxRowsBound,
    pub time_window_days: Option<u32>,
    /// `column -> table.column` for each FK reference
    pub references: Vec<String>,
    pub columns: Vec<ColumnPlan>,
    pub sequence_offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Plan {
    pub tables: Vec<TablePlan>,
    pub warnings: Vec<String>,
}

/// Validate `spec` and describe each table in processing order
pub fn plan(spec: &DatabaseSpec) -> Result<Plan> {
    let validation = spec.validate()?;
    let tables = processing_order(spec)
        .into_iter()
        .map(|table| table_plan(spec, table))
        .collect();

    Ok(Plan {
        tables,
        warnings: validation.warnings,
    })
}

fn table_plan(spec: &DatabaseSpec, table: &TableRule) -> TablePlan {
    TablePlan {
        name: table.name.clone(),
        processing_order: table.order(),
        root: table.is_root(),
        strategy: spec.effective_strategy(table).map(String::from),
        max_rows: spec.effective_max_rows(table).into(),
        time_window_days: table.subset.time_window_days,
        references: table
            .references()
            .iter()
            .map(|r| {
                format!(
                    "{} -> {}.{}",
                    r.column,
                    r.table,
                    r.column_ref.as_deref().unwrap_or("id")
                )
            })
            .collect(),
        columns: table.columns.values().map(column_plan).collect(),
        sequence_offset: table.sequence_offset(),
    }
}

fn column_plan(column: &ColumnRule) -> ColumnPlan {
    let strategy = column.strategy();
    let transform = match strategy {
        ColumnStrategy::Mask => column.mask.as_ref().map(|m| m.kind.to_string()),
        ColumnStrategy::Synthesize => column.synth.as_ref().map(|s| s.kind.to_string()),
        _ => None,
    };

    ColumnPlan {
        name: column.name.clone(),
        sensitivity: column.sensitivity.clone(),
        strategy: strategy.to_string(),
        transform,
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            writeln!(f, "Table: {}", table.name)?;
            writeln!(f, "  Processing order: {}", table.processing_order)?;
            writeln!(
                f,
                "  Strategy: {}{}",
                table.strategy.as_deref().unwrap_or("none"),
                if table.root { " (root)" } else { "" }
            )?;
            match table.max_rows {
                MaxRowsBound::Rows(n) => writeln!(f, "  Max rows: {}", n)?,
                MaxRowsBound::Unbounded => writeln!(f, "  Max rows: none")?,
            }
            if let Some(days) = table.time_window_days {
                writeln!(f, "  Time window: {} days", days)?;
            }
            for reference in &table.references {
                writeln!(f, "  References: {}", reference)?;
            }
            if let Some(offset) = table.sequence_offset {
                writeln!(f, "  Sequence offset: {}", offset)?;
            }
            if !table.columns.is_empty() {
                writeln!(f, "  Columns:")?;
                for column in &table.columns {
                    write!(
                        f,
                        "    - {} ({}) -> {}",
                        column.name,
                        column.sensitivity.as_deref().unwrap_or("-"),
                        column.strategy
                    )?;
                    match &column.transform {
                        Some(kind) => writeln!(f, "/{}", kind)?,
                        None => writeln!(f)?,
                    }
                }
            }
        }
        Ok(())
    }
}
