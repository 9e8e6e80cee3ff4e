//! Run-level metrics: stage outcomes and rows handed to storage

use super::{phase_metric, PhaseMetrics};
use crate::app::{Stage, StageStatus};

pub struct RunMetrics;

impl RunMetrics {
    pub fn record_run_started() {
        ::metrics::counter!(phase_metric!(counter, "run", "started")).increment(1);
    }

    /// Count one stage outcome, labelled by stage and status
    pub fn record_stage(stage: Stage, status: &StageStatus) {
        let status = match status {
            StageStatus::Completed { .. } => "completed",
            StageStatus::Failed { .. } => "failed",
            StageStatus::Skipped { .. } => "skipped",
        };
        ::metrics::counter!(
            phase_metric!(counter, "run", "stages"),
            "stage" => stage.as_str(),
            "status" => status
        )
        .increment(1);
    }

    pub fn record_movies_written(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "persist", "movies_written"))
            .increment(rows as u64);
    }

    pub fn record_ratings_written(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "persist", "ratings_written"))
            .increment(rows as u64);
    }
}

impl PhaseMetrics for RunMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "run", "started"));
        let _ = ::metrics::counter!(phase_metric!(counter, "persist", "movies_written"));
        let _ = ::metrics::counter!(phase_metric!(counter, "persist", "ratings_written"));
    }
}
