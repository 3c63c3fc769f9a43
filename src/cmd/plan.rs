use anyhow::Context;
use devdb::plan::plan;
use devdb::spec::DatabaseSpec;
use std::path::PathBuf;

pub fn run(config: PathBuf, json: bool) -> anyhow::Result<()> {
    let spec = DatabaseSpec::load(&config)
        .with_context(|| format!("Failed to load specification {}", config.display()))?;
    print(&spec, json)
}

/// Print the plan for `spec` to stdout
pub fn print(spec: &DatabaseSpec, json: bool) -> anyhow::Result<()> {
    let plan = plan(spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("DRY RUN - {} tables", plan.tables.len());
    println!();
    print!("{}", plan);
    if !plan.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &plan.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}
