//! Per-stage counters for normalization, cleaning, reconciliation and ratings

use super::{phase_metric, PhaseMetrics};
use crate::pipeline::processing::normalize::NormalizedBatch;
use crate::pipeline::processing::reconcile::ReconcileOutput;

pub struct NormalizeMetrics;

impl NormalizeMetrics {
    pub fn record_batch(batch: &NormalizedBatch) {
        ::metrics::counter!(phase_metric!(counter, "normalize", "records_input"))
            .increment(batch.input_count as u64);
        ::metrics::counter!(phase_metric!(counter, "normalize", "filtered"))
            .increment(batch.filtered_count as u64);
        ::metrics::counter!(phase_metric!(counter, "normalize", "missing_id"))
            .increment(batch.missing_id_count as u64);
        ::metrics::counter!(phase_metric!(counter, "normalize", "duplicates"))
            .increment(batch.duplicate_count as u64);
        ::metrics::counter!(phase_metric!(counter, "normalize", "columns_dropped"))
            .increment(batch.dropped_columns.len() as u64);
        ::metrics::counter!(phase_metric!(counter, "normalize", "records_output"))
            .increment(batch.records.len() as u64);
    }
}

impl PhaseMetrics for NormalizeMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "records_input"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "filtered"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "missing_id"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "duplicates"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "columns_dropped"));
        let _ = ::metrics::counter!(phase_metric!(counter, "normalize", "records_output"));
    }
}

pub struct CleanMetrics;

impl CleanMetrics {
    /// `dropped` counts adult and corrupted rows
    pub fn record_metadata(input: usize, kept: usize) {
        ::metrics::counter!(phase_metric!(counter, "clean", "metadata_rows_input"))
            .increment(input as u64);
        ::metrics::counter!(phase_metric!(counter, "clean", "metadata_rows_kept"))
            .increment(kept as u64);
        ::metrics::counter!(phase_metric!(counter, "clean", "metadata_rows_dropped"))
            .increment(input.saturating_sub(kept) as u64);
    }

    pub fn record_ratings(events: usize) {
        ::metrics::counter!(phase_metric!(counter, "clean", "rating_events"))
            .increment(events as u64);
    }
}

impl PhaseMetrics for CleanMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "clean", "metadata_rows_input"));
        let _ = ::metrics::counter!(phase_metric!(counter, "clean", "metadata_rows_kept"));
        let _ = ::metrics::counter!(phase_metric!(counter, "clean", "metadata_rows_dropped"));
        let _ = ::metrics::counter!(phase_metric!(counter, "clean", "rating_events"));
    }
}

pub struct ReconcileMetrics;

impl ReconcileMetrics {
    pub fn record(output: &ReconcileOutput) {
        ::metrics::counter!(phase_metric!(counter, "reconcile", "joined"))
            .increment(output.joined_count as u64);
        ::metrics::counter!(phase_metric!(counter, "reconcile", "mismatches"))
            .increment(output.mismatch_count as u64);
        ::metrics::counter!(phase_metric!(counter, "reconcile", "records_output"))
            .increment(output.records.len() as u64);
    }
}

impl PhaseMetrics for ReconcileMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "joined"));
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "mismatches"));
        let _ = ::metrics::counter!(phase_metric!(counter, "reconcile", "records_output"));
    }
}

pub struct RatingsMetrics;

impl RatingsMetrics {
    /// One streamed chunk that has been counted and persisted
    pub fn record_chunk(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "ratings", "chunks")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "ratings", "chunk_rows"))
            .record(rows as f64);
    }

    pub fn record_join(movies: usize, rating_columns: usize) {
        ::metrics::counter!(phase_metric!(counter, "ratings", "movies_joined"))
            .increment(movies as u64);
        ::metrics::histogram!(phase_metric!(histogram, "ratings", "rating_columns"))
            .record(rating_columns as f64);
    }
}

impl PhaseMetrics for RatingsMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "ratings", "chunks"));
        let _ = ::metrics::counter!(phase_metric!(counter, "ratings", "movies_joined"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "ratings", "chunk_rows"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "ratings", "rating_columns"));
    }
}
