//! Per-table row selection.

use super::Registry;
use crate::error::Result;
use crate::spec::{DatabaseSpec, SubsetStrategy, TableRule};
use crate::store::{IdFilter, IdQuery, SourceStore};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

/// Computes the selected id set of one table from its rule and the
/// selections made before it
#[derive(Debug, Clone, Copy)]
pub struct RowSelector<'a> {
    spec: &'a DatabaseSpec,
    now: DateTime<Utc>,
}

impl<'a> RowSelector<'a> {
    /// `now` anchors time-window cutoffs
    pub fn new(spec: &'a DatabaseSpec, now: DateTime<Utc>) -> Self {
        Self { spec, now }
    }

    pub fn select<S: SourceStore + ?Sized>(
        &self,
        table: &TableRule,
        registry: &Registry,
        source: &S,
    ) -> Result<BTreeSet<i64>> {
        match self.spec.effective_strategy(table) {
            Some(SubsetStrategy::All) => self.select_all(table, source),
            Some(SubsetStrategy::Sample) => self.select_sample(table, source),
            Some(SubsetStrategy::FkClosure) => self.select_closure(table, registry, source),
            Some(SubsetStrategy::Unknown(name)) => {
                tracing::debug!("{}: unknown strategy '{}', nothing selected", table.name, name);
                Ok(BTreeSet::new())
            }
            None => {
                tracing::debug!("{}: no strategy, nothing selected", table.name);
                Ok(BTreeSet::new())
            }
        }
    }

    fn select_all<S: SourceStore + ?Sized>(
        &self,
        table: &TableRule,
        source: &S,
    ) -> Result<BTreeSet<i64>> {
        let ids = source.select_ids(&IdQuery::new(&table.name))?;
        Ok(ids.into_iter().collect())
    }

    fn select_sample<S: SourceStore + ?Sized>(
        &self,
        table: &TableRule,
        source: &S,
    ) -> Result<BTreeSet<i64>> {
        let mut query = IdQuery::new(&table.name).limit(self.spec.effective_max_rows(table));

        if let Some(days) = table.subset.time_window_days {
            query = query.filter(IdFilter::CreatedSince(self.cutoff(days)));
        }
        if let Some(order_by) = &table.subset.order_by {
            query = query.order_by(order_by);
        }

        let ids = source.select_ids(&query)?;
        Ok(ids.into_iter().collect())
    }

    /// Union of per-reference matches. Each reference is bounded on its own,
    /// so the union can exceed the table's `max_rows`.
    fn select_closure<S: SourceStore + ?Sized>(
        &self,
        table: &TableRule,
        registry: &Registry,
        source: &S,
    ) -> Result<BTreeSet<i64>> {
        let limit = self.spec.effective_max_rows(table);
        let mut selected = BTreeSet::new();

        for reference in table.references() {
            let parents = match registry.get(&reference.table) {
                Some(ids) if !ids.is_empty() => ids,
                _ => {
                    tracing::debug!(
                        "{}.{}: no selected rows in {}, reference skipped",
                        table.name,
                        reference.column,
                        reference.table
                    );
                    continue;
                }
            };

            let query = IdQuery::new(&table.name)
                .filter(IdFilter::ColumnIn {
                    column: reference.column.clone(),
                    ids: parents.clone(),
                })
                .limit(limit);
            selected.extend(source.select_ids(&query)?);
        }

        Ok(selected)
    }

    fn cutoff(&self, days: u32) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(days))
    }
}
