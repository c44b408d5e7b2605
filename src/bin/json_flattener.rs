//! json-flattener: Flatten staged JSON documents into relational tables
//!
//! Usage:
//!   # List every path in a sample of the pending documents
//!   json-flattener --db staging.db discover --table events_toprocess
//!
//!   # Distinct values at one path, for building filters
//!   json-flattener --db staging.db values --table events_toprocess --path user.plan
//!
//!   # Suggest tables, columns and types from a filtered sample
//!   json-flattener --db staging.db analyze --table events --filters where.json
//!
//!   # Create tables and flatten one batch as described by a job file
//!   json-flattener --db staging.db run --job job.json --batch-size 500

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use json_flattener::analysis::{analyze_table, discover_table, field_values, AnalyzerConfig};
use json_flattener::{Executor, FlattenJob, SqliteStore, WhereCondition};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "json-flattener")]
#[command(about = "Flatten staged JSON documents into relational tables", long_about = None)]
struct Args {
    /// SQLite database holding the pending, archive and destination tables
    #[arg(long, value_name = "FILE")]
    db: PathBuf,

    /// Compact output (no pretty-printing)
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover paths, null counts and distinct values in a table's documents
    Discover {
        #[arg(long)]
        table: String,

        #[arg(long, default_value_t = 100)]
        sample_size: usize,

        /// Maximum nesting depth to walk
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// List distinct non-null values at a JSON path
    Values {
        #[arg(long)]
        table: String,

        /// Dot-delimited path, e.g. user.plan
        #[arg(long)]
        path: String,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Analyze types and suggest a relational layout for a base table
    Analyze {
        /// Base table name; documents are sampled from this table
        #[arg(long)]
        table: String,

        #[arg(long, default_value_t = 100)]
        sample_size: usize,

        /// JSON file with an array of where conditions
        #[arg(long, value_name = "FILE")]
        filters: Option<PathBuf>,

        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Create flagged tables and flatten one batch of pending records
    Run {
        /// Job document (tables, mappings, relationships, filters)
        #[arg(long, value_name = "FILE")]
        job: PathBuf,

        /// Override the job's batch size
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;

    match args.command {
        Command::Discover {
            table,
            sample_size,
            max_depth,
        } => {
            let config = analyzer_config(max_depth);
            let discovery = discover_table(&store, &table, sample_size, &config)
                .with_context(|| format!("Failed to discover fields in {}", table))?;
            info!(fields = discovery.fields.len(), sampled = discovery.sample_size, "discovery complete");
            print_json(&discovery, args.compact)
        }
        Command::Values { table, path, limit } => {
            let values = field_values(&store, &table, &path, limit)
                .with_context(|| format!("Failed to read values of {} in {}", path, table))?;
            info!(count = values.values.len(), "values loaded");
            print_json(&values, args.compact)
        }
        Command::Analyze {
            table,
            sample_size,
            filters,
            max_depth,
        } => {
            let conditions = match filters {
                Some(path) => load_conditions(&path)?,
                None => Vec::new(),
            };
            let config = analyzer_config(max_depth);
            let report = analyze_table(&store, &table, sample_size, &conditions, &config)
                .with_context(|| format!("Failed to analyze {}", table))?;
            info!(
                fields = report.fields.len(),
                sampled = report.sampled_records,
                total = report.total_records_in_table,
                "analysis complete"
            );
            print_json(&report, args.compact)
        }
        Command::Run { job, batch_size } => {
            let mut flatten_job = FlattenJob::from_path(&job)
                .with_context(|| format!("Failed to load job {}", job.display()))?;
            if let Some(size) = batch_size {
                flatten_job.batch_size = size;
            }

            let result = Executor::new(&store)
                .execute(&flatten_job)
                .with_context(|| format!("Flattening {} failed", flatten_job.base_table_name))?;
            info!(
                processed = result.processed,
                moved = result.moved,
                errors = result.errors.len(),
                "run complete"
            );
            print_json(&result, args.compact)
        }
    }
}

fn analyzer_config(max_depth: Option<usize>) -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }
    config
}

fn load_conditions(path: &PathBuf) -> Result<Vec<WhereCondition>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse conditions in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let output = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", output);
    Ok(())
}
