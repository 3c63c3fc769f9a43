//! Manifest describing what a dump contains.

use crate::spec::DatabaseSpec;
use crate::subset::{processing_order, Registry};
use chrono::{DateTime, SecondsFormat, Utc};
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::borrow::Cow;

/// Effective row bound recorded for a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxRowsBound {
    Rows(u64),
    /// Serialized as the string `"none"`
    Unbounded,
}

impl From<Option<u64>> for MaxRowsBound {
    fn from(bound: Option<u64>) -> Self {
        bound.map(MaxRowsBound::Rows).unwrap_or(MaxRowsBound::Unbounded)
    }
}

impl Serialize for MaxRowsBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaxRowsBound::Rows(n) => serializer.serialize_u64(*n),
            MaxRowsBound::Unbounded => serializer.serialize_str("none"),
        }
    }
}

impl JsonSchema for MaxRowsBound {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("MaxRowsBound")
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "oneOf": [
                { "type": "integer", "minimum": 1 },
                { "const": "none" }
            ]
        })
    }
}

/// Manifest entry for one table
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct TableManifest {
    /// Effective subset strategy name, null when none applies
    pub strategy: Option<String>,
    pub selected_rows: u64,
    pub max_rows: MaxRowsBound,
}

/// Table entries in processing order; serialized as a JSON object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestTables(pub Vec<(String, TableManifest)>);

impl ManifestTables {
    pub fn get(&self, table: &str) -> Option<&TableManifest> {
        self.0.iter().find(|(name, _)| name == table).map(|(_, t)| t)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ManifestTables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, table) in &self.0 {
            map.serialize_entry(name, table)?;
        }
        map.end()
    }
}

impl JsonSchema for ManifestTables {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("ManifestTables")
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        let entry = generator.subschema_for::<TableManifest>();
        json_schema!({
            "type": "object",
            "additionalProperties": entry
        })
    }
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Manifest {
    /// RFC 3339 UTC timestamp
    pub generated_at: String,
    pub source_database: String,
    pub destination_database: String,
    pub tables: ManifestTables,
}

impl Manifest {
    /// One entry per table in the document, including tables that selected nothing
    pub fn build(
        spec: &DatabaseSpec,
        registry: &Registry,
        source_database: &str,
        destination_database: &str,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let tables = processing_order(spec)
            .into_iter()
            .map(|table| {
                (
                    table.name.clone(),
                    TableManifest {
                        strategy: spec.effective_strategy(table).map(String::from),
                        selected_rows: registry.selected_count(&table.name) as u64,
                        max_rows: spec.effective_max_rows(table).into(),
                    },
                )
            })
            .collect();

        Self {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            source_database: source_database.to_string(),
            destination_database: destination_database.to_string(),
            tables: ManifestTables(tables),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
