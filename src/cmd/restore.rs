use anyhow::Context;
use devdb::restore::Restorer;
use devdb::store::DuckDbStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

pub fn run(target: PathBuf, dump: PathBuf, progress: bool, json: bool) -> anyhow::Result<()> {
    if !dump.exists() {
        return Err(devdb::Error::DumpNotFound(dump).into());
    }

    let mut store = DuckDbStore::open(&target)
        .with_context(|| format!("Failed to open target {}", target.display()))?;

    if !json {
        eprintln!("Restoring {} into {}", dump.display(), target.display());
    }

    let pb = if progress && !json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Restoring...");
        Some(pb)
    } else {
        None
    };

    let start_time = Instant::now();
    let mut restorer = Restorer::new(&mut store);
    if let Some(pb) = pb.clone() {
        restorer = restorer.with_progress(move |n| pb.set_message(format!("{} statements", n)));
    }
    let stats = restorer.restore_file(&dump)?;

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    eprintln!();
    eprintln!("Restore summary:");
    eprintln!("  Statements executed: {}", stats.executed);
    eprintln!("  Succeeded: {}", stats.succeeded());
    eprintln!("  Failed: {}", stats.failed);
    if stats.unterminated > 0 {
        eprintln!("  Unterminated tail: {} bytes (not executed)", stats.unterminated);
    }
    eprintln!("  Time: {:.3?}", start_time.elapsed());

    for failure in &stats.failures {
        eprintln!("  line {}: {}... ({})", failure.line, failure.statement, failure.error);
    }

    Ok(())
}
