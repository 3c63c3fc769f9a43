//! End-to-end generate run: validate, select, write dump and manifest.

use crate::dialect::SqlDialect;
use crate::dump::{DumpStats, DumpWriter, Manifest, DUMP_FILE_NAME, MANIFEST_FILE_NAME};
use crate::error::{Error, Result};
use crate::spec::DatabaseSpec;
use crate::store::SourceStore;
use crate::subset::{select_all, SelectionStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Settings for one generate run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub output_dir: PathBuf,
    pub dialect: SqlDialect,
    /// Name recorded in the manifest
    pub source_database: String,
    /// Name recorded in the manifest
    pub destination_database: String,
    /// Anchor for time windows and the generation timestamp
    pub now: DateTime<Utc>,
}

impl GenerateOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            dialect: SqlDialect::default(),
            source_database: "source".to_string(),
            destination_database: "destination".to_string(),
            now: Utc::now(),
        }
    }

    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn databases(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.source_database = source.into();
        self.destination_database = destination.into();
        self
    }

    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub dump_path: PathBuf,
    pub manifest_path: PathBuf,
    pub selection: SelectionStats,
    pub dump: DumpStats,
    pub warnings: Vec<String>,
}

/// Run a full generate. Nothing is written to `output_dir` unless every step succeeds.
pub fn generate<S: SourceStore + ?Sized>(
    spec: &DatabaseSpec,
    source: &S,
    options: &GenerateOptions,
) -> Result<GenerateReport> {
    let validation = spec.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{}", warning);
    }

    fs::create_dir_all(&options.output_dir)?;

    let (registry, selection) = select_all(spec, source, options.now)?;

    let mut dump_file = NamedTempFile::new_in(&options.output_dir)?;
    let dump = {
        let mut out = BufWriter::new(dump_file.as_file_mut());
        let stats = DumpWriter::new(spec, options.dialect).write_dump(
            &registry,
            source,
            &mut out,
            options.now,
        )?;
        out.flush()?;
        stats
    };

    let manifest = Manifest::build(
        spec,
        &registry,
        &options.source_database,
        &options.destination_database,
        options.now,
    );
    let mut manifest_file = NamedTempFile::new_in(&options.output_dir)?;
    manifest_file.write_all(manifest.to_json_pretty()?.as_bytes())?;
    manifest_file.write_all(b"\n")?;

    let dump_path = options.output_dir.join(DUMP_FILE_NAME);
    let manifest_path = options.output_dir.join(MANIFEST_FILE_NAME);
    persist(dump_file, &dump_path)?;
    persist(manifest_file, &manifest_path)?;

    tracing::info!(
        "Wrote {} rows from {} tables to {}",
        dump.rows_written,
        dump.tables_written,
        dump_path.display()
    );

    Ok(GenerateReport {
        dump_path,
        manifest_path,
        selection,
        dump,
        warnings: validation.warnings,
    })
}

fn persist(file: NamedTempFile, path: &Path) -> Result<()> {
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
