use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, InputsConfig};
use crate::domain::TabularEntityRecord;
use crate::metrics::{CleanMetrics, RatingsMetrics, RunMetrics};
use crate::pipeline::ingestion::{load_metadata_rows, load_wiki_records, RatingsChunks};
use crate::pipeline::processing::clean::{clean_metadata, clean_ratings};
use crate::pipeline::processing::normalize::{NormalizedBatch, NormalizerConfig, WikiNormalizer};
use crate::pipeline::processing::ratings::{join_ratings, RatingHistogram, RatingHistogramBuilder};
use crate::pipeline::processing::reconcile::{MismatchPolicy, Reconciler};
use crate::pipeline::storage::Storage;

/// Stages of one pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Wiki,
    Metadata,
    Reconcile,
    Ratings,
    JoinRatings,
    PersistMovies,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Wiki => "wiki",
            Stage::Metadata => "metadata",
            Stage::Reconcile => "reconcile",
            Stage::Ratings => "ratings",
            Stage::JoinRatings => "join_ratings",
            Stage::PersistMovies => "persist_movies",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StageStatus {
    Completed { rows: usize },
    Failed { error: String },
    /// Not attempted because an upstream stage produced no output
    Skipped { missing_dependency: Stage },
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stages: Vec<StageReport>,
    pub movies_written: usize,
    pub ratings_written: usize,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: Vec::new(),
            movies_written: 0,
            ratings_written: 0,
        }
    }

    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|report| report.stage == stage)
            .map(|report| &report.status)
    }

    pub fn is_success(&self) -> bool {
        self.stages
            .iter()
            .all(|report| matches!(report.status, StageStatus::Completed { .. }))
    }

    fn push(&mut self, stage: Stage, status: StageStatus) {
        self.stages.push(StageReport { stage, status });
    }

    /// Record the outcome of a stage and hand back its output if it succeeded
    fn settle<T>(&mut self, stage: Stage, result: Result<T>, rows: impl FnOnce(&T) -> usize) -> Option<T> {
        match result {
            Ok(value) => {
                let rows = rows(&value);
                info!(stage = %stage, rows, "stage completed");
                let status = StageStatus::Completed { rows };
                RunMetrics::record_stage(stage, &status);
                self.push(stage, status);
                Some(value)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!(stage = %stage, error = %message, "stage failed");
                let status = StageStatus::Failed { error: message };
                RunMetrics::record_stage(stage, &status);
                self.push(stage, status);
                None
            }
        }
    }

    fn skip(&mut self, stage: Stage, missing_dependency: Stage) {
        warn!(stage = %stage, dependency = %missing_dependency, "stage skipped");
        let status = StageStatus::Skipped { missing_dependency };
        RunMetrics::record_stage(stage, &status);
        self.push(stage, status);
    }
}

/// Paths of the three source files
#[derive(Debug, Clone)]
pub struct EtlInputs {
    pub wiki_path: PathBuf,
    pub metadata_path: PathBuf,
    pub ratings_path: PathBuf,
}

impl From<&InputsConfig> for EtlInputs {
    fn from(config: &InputsConfig) -> Self {
        Self {
            wiki_path: config.wiki_path.clone(),
            metadata_path: config.metadata_path.clone(),
            ratings_path: config.ratings_path.clone(),
        }
    }
}

/// Use case running the full extract, transform and load sequence
pub struct EtlUseCase {
    normalizer: WikiNormalizer,
    reconciler: Reconciler,
    chunk_size: usize,
    storage: Arc<dyn Storage>,
}

impl EtlUseCase {
    pub fn new(config: &Config, storage: Arc<dyn Storage>) -> Self {
        let normalizer = WikiNormalizer::with_config(NormalizerConfig {
            null_rate_threshold: config.policy.null_rate_threshold,
        });
        let reconciler = Reconciler::with_mismatch_policy(MismatchPolicy {
            modern_cutoff: config.policy.modern_cutoff,
            early_cutoff: config.policy.early_cutoff,
        });

        Self {
            normalizer,
            reconciler,
            chunk_size: config.ratings.chunk_size,
            storage,
        }
    }

    /// Load and normalize the encyclopedia dump
    pub fn normalize_wiki(&self, path: &Path) -> Result<NormalizedBatch> {
        let raw = load_wiki_records(path)
            .with_context(|| format!("loading encyclopedia file {}", path.display()))?;
        Ok(self.normalizer.normalize(raw))
    }

    /// Load and clean the metadata table
    pub fn clean_metadata(&self, path: &Path) -> Result<Vec<TabularEntityRecord>> {
        let rows = load_metadata_rows(path)
            .with_context(|| format!("loading metadata file {}", path.display()))?;
        clean_metadata(rows).with_context(|| format!("cleaning metadata file {}", path.display()))
    }

    /// Aggregate the ratings log without persisting it
    pub fn summarize_ratings(&self, path: &Path) -> Result<RatingHistogram> {
        let mut builder = RatingHistogramBuilder::new();
        let chunks = RatingsChunks::open(path, self.chunk_size)
            .with_context(|| format!("opening ratings file {}", path.display()))?;
        for chunk in chunks {
            let chunk = chunk.with_context(|| format!("reading ratings file {}", path.display()))?;
            let events = clean_ratings(chunk.rows, chunk.offset)
                .with_context(|| format!("cleaning ratings file {}", path.display()))?;
            builder.observe(&events);
        }
        Ok(builder.finish())
    }

    /// Stream the ratings log chunk by chunk: each chunk is cleaned, counted
    /// and appended to storage before the next one is read.
    async fn stream_ratings(&self, path: &Path, written: &mut usize) -> Result<RatingHistogram> {
        let mut builder = RatingHistogramBuilder::new();
        let chunks = RatingsChunks::open(path, self.chunk_size)
            .with_context(|| format!("opening ratings file {}", path.display()))?;

        for chunk in chunks {
            let chunk = chunk.with_context(|| format!("reading ratings file {}", path.display()))?;
            let offset = chunk.offset;
            let events = clean_ratings(chunk.rows, offset)
                .with_context(|| format!("cleaning ratings file {}", path.display()))?;
            CleanMetrics::record_ratings(events.len());
            builder.observe(&events);

            let appended = self
                .storage
                .append_ratings(&events)
                .await
                .context("appending ratings chunk")?;
            *written += appended;
            RunMetrics::record_ratings_written(appended);
            RatingsMetrics::record_chunk(appended);
            debug!(offset, rows = events.len(), total = *written, "persisted ratings chunk");
        }

        Ok(builder.finish())
    }

    pub async fn run(&self, inputs: &EtlInputs) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", run_id = %run_id);
        self.run_stages(inputs, run_id).instrument(span).await
    }

    async fn run_stages(&self, inputs: &EtlInputs, run_id: Uuid) -> RunReport {
        let mut report = RunReport::new(run_id);
        RunMetrics::record_run_started();
        info!("Starting pipeline run");

        let wiki = info_span!("wiki").in_scope(|| self.normalize_wiki(&inputs.wiki_path));
        let wiki = report.settle(Stage::Wiki, wiki, |batch| batch.records.len());
        let metadata =
            info_span!("metadata").in_scope(|| self.clean_metadata(&inputs.metadata_path));
        let metadata = report.settle(Stage::Metadata, metadata, Vec::len);

        let movies = match (wiki, metadata) {
            (Some(wiki), Some(metadata)) => {
                let output = info_span!("reconcile")
                    .in_scope(|| self.reconciler.reconcile(wiki.records, metadata));
                report.settle(Stage::Reconcile, Ok(output.records), Vec::len)
            }
            (None, _) => {
                report.skip(Stage::Reconcile, Stage::Wiki);
                None
            }
            (_, None) => {
                report.skip(Stage::Reconcile, Stage::Metadata);
                None
            }
        };

        // Ratings persistence does not depend on the movie stages
        let mut ratings_written = 0;
        let ratings_result = self
            .stream_ratings(&inputs.ratings_path, &mut ratings_written)
            .instrument(info_span!("ratings"))
            .await;
        report.ratings_written = ratings_written;
        let histogram = report.settle(Stage::Ratings, ratings_result, |_| ratings_written);

        let table = match (movies, histogram) {
            (Some(movies), Some(histogram)) => {
                let table = info_span!("join_ratings").in_scope(|| join_ratings(movies, &histogram));
                report.settle(Stage::JoinRatings, Ok(table), |t| t.len())
            }
            (None, _) => {
                report.skip(Stage::JoinRatings, Stage::Reconcile);
                None
            }
            (_, None) => {
                report.skip(Stage::JoinRatings, Stage::Ratings);
                None
            }
        };

        match table {
            Some(table) => {
                let result = self
                    .storage
                    .append_movies(&table)
                    .instrument(info_span!("persist_movies"))
                    .await
                    .context("appending movies table");
                if let Some(written) = report.settle(Stage::PersistMovies, result, |n| *n) {
                    RunMetrics::record_movies_written(written);
                    report.movies_written = written;
                }
            }
            None => report.skip(Stage::PersistMovies, Stage::JoinRatings),
        }

        info!(
            success = report.is_success(),
            movies = report.movies_written,
            ratings = report.ratings_written,
            "Pipeline run finished"
        );
        report
    }
}
