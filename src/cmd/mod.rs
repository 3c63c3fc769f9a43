mod generate;
mod plan;
mod restore;
mod schema;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate as generate_completions, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devdb")]
#[command(version)]
#[command(
    about = "Build a small, anonymized development copy of a database and restore it",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select, anonymize and dump a subset of the source database
    Generate {
        /// Source DuckDB database file (opened read-only)
        #[arg(short, long)]
        source: PathBuf,

        /// Specification YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for the dump and manifest
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Dialect for sequence adjustments: mysql, postgres, or sqlite
        #[arg(short, long, default_value = "mysql")]
        dialect: String,

        /// Source database name recorded in the manifest (default: source file stem)
        #[arg(long)]
        source_name: Option<String>,

        /// Destination database name recorded in the manifest (default: source name)
        #[arg(long)]
        destination_name: Option<String>,

        /// Show the plan without touching the source
        #[arg(long)]
        dry_run: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a dump into a target database
    Restore {
        /// Target DuckDB database file (created if missing)
        #[arg(short, long)]
        target: PathBuf,

        /// Dump file; supports .gz, .bz2, .xz, .zst compression
        #[arg(short, long, default_value = "output/lightweight-dump.sql")]
        dump: PathBuf,

        /// Show a progress spinner
        #[arg(short, long)]
        progress: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a specification and show what generate would do
    Plan {
        /// Specification YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print JSON Schemas for spec files and generated artifacts
    Schema {
        /// Schema to print: manifest, plan, or spec (all when omitted)
        name: Option<String>,

        /// Write schemas to this directory instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    if !matches!(cli.command, Commands::Completions { .. }) {
        devdb::logging::init(cli.verbose, cli.quiet)?;
    }

    match cli.command {
        Commands::Generate {
            source,
            config,
            output,
            dialect,
            source_name,
            destination_name,
            dry_run,
            json,
        } => generate::run(generate::GenerateArgs {
            source,
            config,
            output,
            dialect,
            source_name,
            destination_name,
            dry_run,
            json,
        }),
        Commands::Restore {
            target,
            dump,
            progress,
            json,
        } => restore::run(target, dump, progress, json),
        Commands::Plan { config, json } => plan::run(config, json),
        Commands::Schema { name, output } => schema::run(name, output),
        Commands::Completions { shell } => {
            generate_completions(shell, &mut Cli::command(), "devdb", &mut io::stdout());
            Ok(())
        }
    }
}
