//! Declarative specification document for a subset run.
//!
//! A document maps table names to [`TableRule`]s and carries global
//! [`Defaults`]. It is loaded once, validated, and then treated as immutable.
//!
//! ```yaml
//! version: 1
//! defaults:
//!   subset:
//!     max_rows: 1000
//!   masking:
//!     deterministic_salt: "dev-salt"
//!     email_domain: "example.test"
//! tables:
//!   users:
//!     processing_order: 1
//!     subset: { strategy: sample, root: true, order_by: created_at }
//!     columns:
//!       email: { strategy: synthesize, sensitivity: pii, synth: { type: email } }
//! ```

mod names;
mod validate;

pub use names::{ColumnStrategy, MaskType, SubsetStrategy, SynthType};
pub use validate::{is_identifier, Validation};

use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Processing order used for tables that do not declare one
pub const DEFAULT_PROCESSING_ORDER: i32 = 999;

/// Email domain used when neither the column nor the defaults name one
pub const FALLBACK_EMAIL_DOMAIN: &str = "dev.local";

/// Pick the table-level value when present, else the document default.
pub fn resolve<T>(table_value: Option<T>, default_value: Option<T>) -> Option<T> {
    table_value.or(default_value)
}

/// Complete specification document
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DatabaseSpec {
    /// Document format version
    pub version: u32,
    /// Document-wide fallbacks
    pub defaults: Defaults,
    /// Per-table rules keyed by table name
    pub tables: BTreeMap<String, TableRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Defaults {
    pub subset: SubsetDefaults,
    pub masking: MaskingDefaults,
}

/// Default row-sampling policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SubsetDefaults {
    pub strategy: Option<SubsetStrategy>,
    pub max_rows: Option<u64>,
    pub time_window_days: Option<u32>,
}

/// Default masking policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MaskingDefaults {
    /// Key mixed into every digest unless a column overrides it
    pub deterministic_salt: Option<String>,
    pub email_domain: Option<String>,
    pub preserve_length: bool,
}

impl MaskingDefaults {
    /// Column key override if non-empty, else the document salt.
    pub fn effective_key<'a>(&'a self, column_key: Option<&'a str>) -> Option<&'a str> {
        resolve(
            column_key.filter(|k| !k.is_empty()),
            self.deterministic_salt.as_deref().filter(|k| !k.is_empty()),
        )
    }

    pub fn effective_email_domain<'a>(&'a self, column_domain: Option<&'a str>) -> &'a str {
        resolve(column_domain, self.email_domain.as_deref()).unwrap_or(FALLBACK_EMAIL_DOMAIN)
    }
}

/// Rules for one table
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TableRule {
    /// Filled from the map key after loading
    #[serde(skip)]
    pub name: String,
    pub subset: SubsetPolicy,
    pub fk: Option<ForeignKeyRule>,
    pub processing_order: Option<i32>,
    pub post_load: Option<PostLoadRule>,
    pub columns: BTreeMap<String, ColumnRule>,
}

impl TableRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Effective processing order (absent sorts last)
    pub fn order(&self) -> i32 {
        self.processing_order.unwrap_or(DEFAULT_PROCESSING_ORDER)
    }

    pub fn is_root(&self) -> bool {
        self.subset.root
    }

    pub fn column(&self, name: &str) -> Option<&ColumnRule> {
        self.columns.get(name)
    }

    /// Declared FK references, empty when the table has none
    pub fn references(&self) -> &[ForeignKeyReference] {
        self.fk
            .as_ref()
            .map(|fk| fk.references.as_slice())
            .unwrap_or(&[])
    }

    pub fn sequence_offset(&self) -> Option<i64> {
        self.post_load.as_ref().and_then(|p| p.sequence_offset)
    }
}

/// Row-selection policy for one table
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SubsetPolicy {
    pub strategy: Option<SubsetStrategy>,
    /// Keep only rows whose `created_at` is within this many days
    pub time_window_days: Option<u32>,
    /// Root tables are selected before all others
    pub root: bool,
    pub order_by: Option<String>,
    pub max_rows: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForeignKeyRule {
    pub references: Vec<ForeignKeyReference>,
}

/// `column` in this table points at `table`.`column_ref`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForeignKeyReference {
    pub column: String,
    pub table: String,
    pub column_ref: Option<String>,
}

impl ForeignKeyReference {
    pub fn new(column: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: table.into(),
            column_ref: Some("id".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PostLoadRule {
    pub sequence_offset: Option<i64>,
}

/// Transform rule for one column
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColumnRule {
    /// Filled from the map key after loading
    #[serde(skip)]
    pub name: String,
    pub strategy: Option<ColumnStrategy>,
    /// Informational label such as `pii` or `secret`
    pub sensitivity: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub references: Option<String>,
    pub mask: Option<MaskPolicy>,
    pub synth: Option<SynthPolicy>,
}

impl ColumnRule {
    pub fn keep(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: Some(ColumnStrategy::Keep),
            ..Default::default()
        }
    }

    pub fn masked(name: impl Into<String>, mask: MaskPolicy) -> Self {
        Self {
            name: name.into(),
            strategy: Some(ColumnStrategy::Mask),
            mask: Some(mask),
            ..Default::default()
        }
    }

    pub fn synthesized(name: impl Into<String>, synth: SynthPolicy) -> Self {
        Self {
            name: name.into(),
            strategy: Some(ColumnStrategy::Synthesize),
            synth: Some(synth),
            ..Default::default()
        }
    }

    /// Declared strategy; a missing one behaves as `keep`
    pub fn strategy(&self) -> ColumnStrategy {
        self.strategy.clone().unwrap_or(ColumnStrategy::Keep)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MaskPolicy {
    #[serde(rename = "type")]
    pub kind: MaskType,
    pub deterministic_key: Option<String>,
    /// Noise amplitude for `numeric_noise`, in percent of the value
    pub percent: Option<u32>,
    pub preserve_domain: bool,
}

impl MaskPolicy {
    pub fn new(kind: MaskType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SynthPolicy {
    #[serde(rename = "type")]
    pub kind: SynthType,
    pub deterministic_key: Option<String>,
    pub domain: Option<String>,
    pub format: Option<String>,
}

impl SynthPolicy {
    pub fn new(kind: SynthType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

impl DatabaseSpec {
    /// Load a document from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML document and fill table/column names from their keys
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut spec: DatabaseSpec = serde_yaml_ng::from_str(yaml)?;
        spec.assign_names();
        Ok(spec)
    }

    /// Build a document from rules, keyed by each rule's name
    pub fn from_tables(defaults: Defaults, tables: impl IntoIterator<Item = TableRule>) -> Self {
        let mut spec = DatabaseSpec {
            version: 1,
            defaults,
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        };
        spec.assign_names();
        spec
    }

    fn assign_names(&mut self) {
        for (table_name, table) in self.tables.iter_mut() {
            table.name = table_name.clone();
            for (column_name, column) in table.columns.iter_mut() {
                column.name = column_name.clone();
            }
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableRule> {
        self.tables.get(name)
    }

    /// Tables sorted by processing order, ties broken by name.
    ///
    /// Both selection and serialization iterate in this order.
    pub fn tables_in_order(&self) -> Vec<&TableRule> {
        let mut tables: Vec<&TableRule> = self.tables.values().collect();
        tables.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.name.cmp(&b.name)));
        tables
    }

    pub fn effective_strategy(&self, table: &TableRule) -> Option<SubsetStrategy> {
        resolve(
            table.subset.strategy.clone(),
            self.defaults.subset.strategy.clone(),
        )
    }

    /// Row bound for a table: its own `max_rows`, else the default, else unbounded.
    ///
    /// Only `sample` and `fk_closure` selections are bounded; every other
    /// strategy reports no bound.
    pub fn effective_max_rows(&self, table: &TableRule) -> Option<u64> {
        match self.effective_strategy(table) {
            Some(SubsetStrategy::Sample | SubsetStrategy::FkClosure) => {
                resolve(table.subset.max_rows, self.defaults.subset.max_rows)
            }
            _ => None,
        }
    }

    /// Check the document before any store access
    pub fn validate(&self) -> Result<Validation> {
        validate::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
version: 1
defaults:
  subset:
    strategy: sample
    max_rows: 500
  masking:
    deterministic_salt: "dev-salt"
    email_domain: "example.test"
tables:
  users:
    processing_order: 1
    subset:
      strategy: sample
      root: true
      order_by: created_at
      max_rows: 100
    post_load:
      sequence_offset: 100000
    columns:
      email:
        strategy: synthesize
        sensitivity: pii
        unique: true
        synth:
          type: email
      username:
        strategy: mask
        mask:
          type: username
          deterministic_key: "user-key"
  orders:
    processing_order: 2
    subset:
      strategy: fk_closure
    fk:
      references:
        - column: user_id
          table: users
          column_ref: id
  audit_log:
    subset:
      strategy: archive
"#;

    #[test]
    fn test_parse_yaml_spec() {
        let spec = DatabaseSpec::from_yaml_str(SAMPLE_YAML).unwrap();

        assert_eq!(spec.version, 1);
        assert_eq!(spec.tables.len(), 3);

        let users = spec.table("users").unwrap();
        assert_eq!(users.name, "users");
        assert!(users.is_root());
        assert_eq!(users.subset.strategy, Some(SubsetStrategy::Sample));
        assert_eq!(users.sequence_offset(), Some(100000));

        let email = users.column("email").unwrap();
        assert_eq!(email.name, "email");
        assert_eq!(email.strategy(), ColumnStrategy::Synthesize);
        assert_eq!(email.synth.as_ref().unwrap().kind, SynthType::Email);
        assert!(email.unique);

        let orders = spec.table("orders").unwrap();
        assert_eq!(orders.references().len(), 1);
        assert_eq!(orders.references()[0].table, "users");
    }

    #[test]
    fn test_unknown_strategy_is_preserved() {
        let spec = DatabaseSpec::from_yaml_str(SAMPLE_YAML).unwrap();
        let audit = spec.table("audit_log").unwrap();
        assert_eq!(
            audit.subset.strategy,
            Some(SubsetStrategy::Unknown("archive".to_string()))
        );
        assert_eq!(audit.order(), DEFAULT_PROCESSING_ORDER);
    }

    #[test]
    fn test_tables_in_order() {
        let spec = DatabaseSpec::from_yaml_str(SAMPLE_YAML).unwrap();
        let names: Vec<&str> = spec
            .tables_in_order()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["users", "orders", "audit_log"]);
    }

    #[test]
    fn test_order_ties_broken_by_name() {
        let mut zeta = TableRule::new("zeta");
        zeta.processing_order = Some(5);
        let mut alpha = TableRule::new("alpha");
        alpha.processing_order = Some(5);
        let first = TableRule::new("unordered");
        let spec = DatabaseSpec::from_tables(Defaults::default(), vec![first, zeta, alpha]);

        let names: Vec<&str> = spec
            .tables_in_order()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta", "unordered"]);
    }

    #[test]
    fn test_effective_max_rows() {
        let spec = DatabaseSpec::from_yaml_str(SAMPLE_YAML).unwrap();
        assert_eq!(spec.effective_max_rows(spec.table("users").unwrap()), Some(100));
        assert_eq!(spec.effective_max_rows(spec.table("orders").unwrap()), Some(500));

        let bare = DatabaseSpec::from_tables(Defaults::default(), vec![TableRule::new("t")]);
        assert_eq!(bare.effective_max_rows(bare.table("t").unwrap()), None);
    }

    #[test]
    fn test_unbounded_strategies_ignore_default_max_rows() {
        let yaml = r#"
defaults:
  subset: { max_rows: 1 }
tables:
  countries:
    subset: { strategy: all, max_rows: 5 }
  archive:
    subset: { strategy: archive }
  loose:
    subset: {}
"#;
        let spec = DatabaseSpec::from_yaml_str(yaml).unwrap();
        for name in ["countries", "archive", "loose"] {
            assert_eq!(spec.effective_max_rows(spec.table(name).unwrap()), None, "{}", name);
        }
    }

    #[test]
    fn test_effective_strategy_falls_back_to_default() {
        let yaml = r#"
defaults:
  subset:
    strategy: all
tables:
  countries: {}
"#;
        let spec = DatabaseSpec::from_yaml_str(yaml).unwrap();
        let countries = spec.table("countries").unwrap();
        assert_eq!(spec.effective_strategy(countries), Some(SubsetStrategy::All));
    }

    #[test]
    fn test_masking_key_resolution() {
        let masking = MaskingDefaults {
            deterministic_salt: Some("salt".to_string()),
            ..Default::default()
        };
        assert_eq!(masking.effective_key(Some("override")), Some("override"));
        assert_eq!(masking.effective_key(Some("")), Some("salt"));
        assert_eq!(masking.effective_key(None), Some("salt"));
        assert_eq!(MaskingDefaults::default().effective_key(None), None);
    }

    #[test]
    fn test_email_domain_resolution() {
        let masking = MaskingDefaults {
            email_domain: Some("corp.test".to_string()),
            ..Default::default()
        };
        assert_eq!(masking.effective_email_domain(Some("x.test")), "x.test");
        assert_eq!(masking.effective_email_domain(None), "corp.test");
        assert_eq!(
            MaskingDefaults::default().effective_email_domain(None),
            FALLBACK_EMAIL_DOMAIN
        );
    }
}
