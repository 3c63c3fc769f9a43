//! Pre-flight checks for specification documents.
//!
//! Table, column and ordering names end up interpolated into SQL, so they are
//! restricted to plain identifiers. Problems that would only degrade output
//! (an empty closure, a no-op transform) are warnings, not errors.

use super::{ColumnStrategy, DatabaseSpec, SubsetStrategy, TableRule};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Whether `name` is safe to use unquoted as a table or column name
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Outcome of a successful validation
#[derive(Debug, Default, Clone)]
pub struct Validation {
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub(super) fn validate(spec: &DatabaseSpec) -> Result<Validation> {
    let mut errors: Vec<String> = Vec::new();
    let mut validation = Validation::default();

    if spec.defaults.subset.max_rows == Some(0) {
        errors.push("defaults.subset.max_rows must be greater than 0".to_string());
    }

    let order = spec.tables_in_order();
    let position = |name: &str| order.iter().position(|t| t.name == name);

    for table in &order {
        check_identifier(&mut errors, "table name", &table.name, &table.name);
        check_table(spec, table, &mut errors, &mut validation.warnings);

        if let Some(strategy) = spec.effective_strategy(table) {
            if !strategy.is_known() {
                validation.warnings.push(format!(
                    "Table '{}': unknown subset strategy '{}', no rows will be selected",
                    table.name, strategy
                ));
            }
        } else {
            validation.warnings.push(format!(
                "Table '{}': no subset strategy, no rows will be selected",
                table.name
            ));
        }

        for reference in table.references() {
            let Some(parent) = spec.table(&reference.table) else {
                validation.warnings.push(format!(
                    "Table '{}': FK reference to '{}' which is not a configured table",
                    table.name, reference.table
                ));
                continue;
            };
            if !selected_before(parent, table, position(&parent.name), position(&table.name)) {
                validation.warnings.push(format!(
                    "Table '{}': FK reference to '{}' which is processed later, closure will be empty",
                    table.name, parent.name
                ));
            }
            if let Some(column_ref) = &reference.column_ref {
                if column_ref != "id" {
                    validation.warnings.push(format!(
                        "Table '{}': FK reference to '{}.{}' is matched against selected ids",
                        table.name, parent.name, column_ref
                    ));
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(Error::configuration(errors.join("; ")));
    }

    Ok(validation)
}

/// Root tables run before all non-root tables, otherwise sorted order applies.
fn selected_before(
    parent: &TableRule,
    child: &TableRule,
    parent_pos: Option<usize>,
    child_pos: Option<usize>,
) -> bool {
    match (parent.is_root(), child.is_root()) {
        (true, false) => true,
        (false, true) => false,
        _ => parent_pos < child_pos,
    }
}

fn check_identifier(errors: &mut Vec<String>, what: &str, table: &str, name: &str) {
    if !is_identifier(name) {
        errors.push(format!(
            "Table '{}': {} '{}' is not a valid identifier",
            table, what, name
        ));
    }
}

fn check_table(
    spec: &DatabaseSpec,
    table: &TableRule,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    if table.subset.max_rows == Some(0) {
        errors.push(format!(
            "Table '{}': max_rows must be greater than 0",
            table.name
        ));
    }

    if let Some(order_by) = &table.subset.order_by {
        check_identifier(errors, "order_by column", &table.name, order_by);
    }

    if spec.effective_strategy(table) == Some(SubsetStrategy::FkClosure)
        && table.references().is_empty()
    {
        errors.push(format!(
            "Table '{}': fk_closure strategy requires fk.references",
            table.name
        ));
    }

    for reference in table.references() {
        check_identifier(errors, "FK column", &table.name, &reference.column);
        check_identifier(errors, "referenced table", &table.name, &reference.table);
        if let Some(column_ref) = &reference.column_ref {
            check_identifier(errors, "referenced column", &table.name, column_ref);
        }
    }

    for column in table.columns.values() {
        check_identifier(errors, "column name", &table.name, &column.name);

        let key = match column.strategy() {
            ColumnStrategy::Mask => {
                if column.mask.is_none() {
                    warnings.push(format!(
                        "Column '{}.{}': mask strategy without mask settings, value kept",
                        table.name, column.name
                    ));
                }
                column.mask.as_ref().map(|m| m.deterministic_key.as_deref())
            }
            ColumnStrategy::Synthesize => {
                if column.synth.is_none() {
                    warnings.push(format!(
                        "Column '{}.{}': synthesize strategy without synth settings, value kept",
                        table.name, column.name
                    ));
                }
                column.synth.as_ref().map(|s| s.deterministic_key.as_deref())
            }
            ColumnStrategy::Keep => None,
            ColumnStrategy::Unknown(name) => {
                warnings.push(format!(
                    "Column '{}.{}': unknown strategy '{}', value kept",
                    table.name, column.name, name
                ));
                None
            }
        };

        if let Some(column_key) = key {
            if spec.defaults.masking.effective_key(column_key).is_none() {
                errors.push(format!(
                    "Column '{}.{}': no deterministic key and no defaults.masking.deterministic_salt",
                    table.name, column.name
                ));
            }
        }
    }
}
