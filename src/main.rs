use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use movie_etl::app::{EtlInputs, EtlUseCase, StageStatus};
use movie_etl::config::Config;
use movie_etl::logging;
use movie_etl::metrics as etl_metrics;
use movie_etl::pipeline::storage::{CsvFileStorage, InMemoryStorage, Storage};

#[derive(Parser)]
#[command(name = "movie_etl")]
#[command(about = "Movie metadata ETL: encyclopedia dump, metadata table and ratings log")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and persist movies and ratings
    Run {
        #[arg(long)]
        wiki: Option<PathBuf>,
        #[arg(long)]
        metadata: Option<PathBuf>,
        #[arg(long)]
        ratings: Option<PathBuf>,
        /// Output directory for the CSV tables
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Normalize the encyclopedia dump and print a summary
    Normalize {
        #[arg(long)]
        wiki: Option<PathBuf>,
    },
    /// Aggregate the ratings log and print a summary, without persisting
    Ratings {
        #[arg(long)]
        ratings: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    etl_metrics::init_metrics();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Run {
            wiki,
            metadata,
            ratings,
            output,
        } => {
            let mut inputs = EtlInputs::from(&config.inputs);
            if let Some(path) = wiki {
                inputs.wiki_path = path;
            }
            if let Some(path) = metadata {
                inputs.metadata_path = path;
            }
            if let Some(path) = ratings {
                inputs.ratings_path = path;
            }
            let output_dir = output.unwrap_or_else(|| config.output.dir.clone());

            println!("🚀 Running full pipeline...");
            let storage: Arc<dyn Storage> = Arc::new(CsvFileStorage::new(&output_dir)?);
            let use_case = EtlUseCase::new(&config, storage);
            let report = use_case.run(&inputs).await;

            println!("\n📊 Pipeline Results (run {}):", report.run_id);
            for stage in &report.stages {
                match &stage.status {
                    StageStatus::Completed { rows } => {
                        println!("   ✅ {:<15} {} rows", stage.stage, rows)
                    }
                    StageStatus::Failed { error } => {
                        println!("   ❌ {:<15} {}", stage.stage, error)
                    }
                    StageStatus::Skipped { missing_dependency } => {
                        println!("   ⏭️  {:<15} skipped, needs {}", stage.stage, missing_dependency)
                    }
                }
            }
            println!("   Movies written: {}", report.movies_written);
            println!("   Ratings written: {}", report.ratings_written);
            println!("   Output dir: {}", output_dir.display());
            if let Some(path) = etl_metrics::write_snapshot(&output_dir)? {
                println!("   Metrics snapshot: {}", path.display());
            }

            if !report.is_success() {
                error!(run_id = %report.run_id, "Pipeline finished with failures");
                std::process::exit(1);
            }
        }
        Commands::Normalize { wiki } => {
            let path = wiki.unwrap_or_else(|| config.inputs.wiki_path.clone());
            let use_case = EtlUseCase::new(&config, Arc::new(InMemoryStorage::new()));
            let batch = use_case.normalize_wiki(&path)?;
            info!(records = batch.records.len(), "Normalization finished");

            println!("\n📊 Normalization Results for {}:", path.display());
            println!("   Input records: {}", batch.input_count);
            println!("   Filtered (not feature films): {}", batch.filtered_count);
            println!("   Missing identifier: {}", batch.missing_id_count);
            println!("   Duplicates: {}", batch.duplicate_count);
            println!("   Normalized: {}", batch.records.len());
            println!("   Retained columns: {}", batch.retained_columns.len());
            if !batch.dropped_columns.is_empty() {
                println!("   Dropped columns: {}", batch.dropped_columns.join(", "));
            }
        }
        Commands::Ratings { ratings } => {
            let path = ratings.unwrap_or_else(|| config.inputs.ratings_path.clone());
            let use_case = EtlUseCase::new(&config, Arc::new(InMemoryStorage::new()));
            let histogram = use_case.summarize_ratings(&path)?;

            println!("\n📊 Ratings Results for {}:", path.display());
            println!("   Events: {}", histogram.event_count);
            println!("   Rated movies: {}", histogram.rows.len());
            println!("   Columns: {}", histogram.column_names().join(", "));
        }
    }
    Ok(())
}
