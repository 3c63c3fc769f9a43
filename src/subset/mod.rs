//! Subset selection across all tables of a specification.
//!
//! Tables are visited in processing order with root tables pulled to the
//! front. Each table's selection can depend only on tables visited earlier,
//! which is what makes `fk_closure` sound: a child row is selected only when
//! the parent row it points at is already in the [`Registry`].

mod selector;

pub use selector::RowSelector;

use crate::error::Result;
use crate::spec::{DatabaseSpec, TableRule};
use crate::store::SourceStore;
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Selected ids per table. Entries are written once and never replaced.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    selected: AHashMap<String, BTreeSet<i64>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the selection for `table`. Returns false, leaving the existing
    /// entry untouched, if the table was already recorded.
    pub fn insert(&mut self, table: impl Into<String>, ids: BTreeSet<i64>) -> bool {
        let table = table.into();
        if self.selected.contains_key(&table) {
            return false;
        }
        self.selected.insert(table, ids);
        true
    }

    pub fn get(&self, table: &str) -> Option<&BTreeSet<i64>> {
        self.selected.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.selected.contains_key(table)
    }

    pub fn selected_count(&self, table: &str) -> usize {
        self.selected.get(table).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn total_rows(&self) -> usize {
        self.selected.values().map(|ids| ids.len()).sum()
    }

    /// Number of tables recorded
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Per-table selection summary
#[derive(Debug, Clone, Serialize)]
pub struct TableSelectionStats {
    pub name: String,
    pub strategy: Option<String>,
    pub root: bool,
    pub selected_rows: u64,
    pub max_rows: Option<u64>,
}

/// Selection summary in visiting order
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionStats {
    pub tables: Vec<TableSelectionStats>,
    pub total_rows: u64,
}

/// Tables sorted by processing order, ties broken by name
pub fn processing_order(spec: &DatabaseSpec) -> Vec<&TableRule> {
    spec.tables_in_order()
}

/// Visiting order: root tables first, then the rest, each group in processing order
pub fn visiting_order(spec: &DatabaseSpec) -> Vec<&TableRule> {
    let (roots, rest): (Vec<&TableRule>, Vec<&TableRule>) =
        processing_order(spec).into_iter().partition(|t| t.is_root());
    roots.into_iter().chain(rest).collect()
}

/// Run selection for every table. Any store failure aborts the run.
pub fn select_all<S: SourceStore + ?Sized>(
    spec: &DatabaseSpec,
    source: &S,
    now: DateTime<Utc>,
) -> Result<(Registry, SelectionStats)> {
    let selector = RowSelector::new(spec, now);
    let mut registry = Registry::new();
    let mut stats = SelectionStats::default();

    for table in visiting_order(spec) {
        let ids = selector.select(table, &registry, source)?;
        let count = ids.len() as u64;
        let strategy = spec.effective_strategy(table);

        tracing::info!(
            "Selected {} rows from {} ({})",
            count,
            table.name,
            strategy.as_ref().map(|s| s.as_str()).unwrap_or("none")
        );

        if !registry.insert(table.name.clone(), ids) {
            tracing::warn!("{}: already selected, keeping first selection", table.name);
            continue;
        }

        stats.total_rows += count;
        stats.tables.push(TableSelectionStats {
            name: table.name.clone(),
            strategy: strategy.map(String::from),
            root: table.is_root(),
            selected_rows: count,
            max_rows: spec.effective_max_rows(table),
        });
    }

    tracing::info!(
        "Selection complete: {} rows across {} tables",
        stats.total_rows,
        registry.len()
    );

    Ok((registry, stats))
}
