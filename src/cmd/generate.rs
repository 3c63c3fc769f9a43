use anyhow::Context;
use devdb::dialect::SqlDialect;
use devdb::generate::{generate, GenerateOptions};
use devdb::spec::DatabaseSpec;
use devdb::store::DuckDbStore;
use std::path::PathBuf;
use std::time::Instant;

pub struct GenerateArgs {
    pub source: PathBuf,
    pub config: PathBuf,
    pub output: PathBuf,
    pub dialect: String,
    pub source_name: Option<String>,
    pub destination_name: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let spec = DatabaseSpec::load(&args.config)
        .with_context(|| format!("Failed to load specification {}", args.config.display()))?;
    if !args.json {
        eprintln!("Loaded configuration from: {}", args.config.display());
    }

    if args.dry_run {
        return super::plan::print(&spec, args.json);
    }

    let dialect: SqlDialect = args.dialect.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if !args.source.exists() {
        anyhow::bail!("source database does not exist: {}", args.source.display());
    }
    let source = DuckDbStore::open_read_only(&args.source)
        .with_context(|| format!("Failed to open source {}", args.source.display()))?;

    let source_name = args.source_name.unwrap_or_else(|| {
        args.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string())
    });
    let destination_name = args.destination_name.unwrap_or_else(|| source_name.clone());

    let options = GenerateOptions::new(&args.output)
        .dialect(dialect)
        .databases(source_name, destination_name);

    let start_time = Instant::now();
    let report = generate(&spec, &source, &options)?;
    let elapsed = start_time.elapsed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    eprintln!();
    eprintln!("Generate summary:");
    for table in &report.selection.tables {
        eprintln!(
            "  {:<30} {:>10} rows  [{}{}]",
            table.name,
            table.selected_rows,
            table.strategy.as_deref().unwrap_or("none"),
            if table.root { ", root" } else { "" }
        );
    }
    eprintln!();
    eprintln!("  Tables written: {}", report.dump.tables_written);
    eprintln!("  Rows written: {}", report.dump.rows_written);
    eprintln!(
        "  Sequence adjustments: {} ({})",
        report.dump.sequence_adjustments, dialect
    );
    eprintln!("  Time: {:.3?}", elapsed);
    if !report.warnings.is_empty() {
        eprintln!("  Warnings: {}", report.warnings.len());
    }
    eprintln!();
    eprintln!("Dump: {}", report.dump_path.display());
    eprintln!("Manifest: {}", report.manifest_path.display());

    Ok(())
}
