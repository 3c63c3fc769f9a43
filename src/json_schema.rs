//! JSON Schemas for the specification document and the generated artifacts.
//!
//! Exported through the `schema` subcommand so editors and CI can validate
//! spec files and manifests.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// All schemas keyed by name, in deterministic order
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    schemas.insert("manifest", schema_for!(crate::dump::Manifest));
    schemas.insert("plan", schema_for!(crate::plan::Plan));
    schemas.insert("spec", schema_for!(crate::spec::DatabaseSpec));

    schemas
}

pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
