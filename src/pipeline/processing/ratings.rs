use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use tracing::info;

use crate::constants::RATING_COLUMN_PREFIX;
use crate::domain::{CanonicalEntityRecord, RatedMovie, RatedMovieTable, RatingEvent};
use crate::metrics::RatingsMetrics;

/// A discrete rating value usable as a grouping key
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RatingValue(f64);

impl RatingValue {
    pub fn new(value: f64) -> Self {
        // -0.0 and 0.0 must land in the same bucket
        Self(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// `rating_0.5`, `rating_4.0`: always at least one decimal
    pub fn column_name(&self) -> String {
        format!("{}{:?}", RATING_COLUMN_PREFIX, self.0)
    }
}

impl PartialEq for RatingValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RatingValue {}

impl PartialOrd for RatingValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RatingValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for RatingValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Per-subject counts of each rating value, one column per observed value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingHistogram {
    /// Observed rating values, ascending
    pub values: Vec<RatingValue>,
    /// Counts aligned with `values`, keyed by subject id
    pub rows: HashMap<i64, Vec<u64>>,
    pub event_count: u64,
}

impl RatingHistogram {
    pub fn column_names(&self) -> Vec<String> {
        self.values.iter().map(RatingValue::column_name).collect()
    }

    /// Counts for one subject; subjects without events get all zeros
    pub fn counts_for(&self, movie_id: i64) -> Vec<u64> {
        self.rows
            .get(&movie_id)
            .cloned()
            .unwrap_or_else(|| vec![0; self.values.len()])
    }

    pub fn count(&self, movie_id: i64, rating: f64) -> u64 {
        let key = RatingValue::new(rating);
        self.values
            .iter()
            .position(|v| *v == key)
            .and_then(|idx| self.rows.get(&movie_id).map(|row| row[idx]))
            .unwrap_or(0)
    }
}

/// Accumulates rating events chunk by chunk into a histogram
#[derive(Debug, Default)]
pub struct RatingHistogramBuilder {
    counts: HashMap<i64, BTreeMap<RatingValue, u64>>,
    values: BTreeSet<RatingValue>,
    event_count: u64,
}

impl RatingHistogramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, events: &[RatingEvent]) {
        for event in events {
            let value = RatingValue::new(event.rating);
            self.values.insert(value);
            *self
                .counts
                .entry(event.movie_id)
                .or_default()
                .entry(value)
                .or_insert(0) += 1;
        }
        self.event_count += events.len() as u64;
    }

    pub fn finish(self) -> RatingHistogram {
        let values: Vec<RatingValue> = self.values.into_iter().collect();
        let rows = self
            .counts
            .into_iter()
            .map(|(movie_id, by_value)| {
                let row = values
                    .iter()
                    .map(|v| by_value.get(v).copied().unwrap_or(0))
                    .collect();
                (movie_id, row)
            })
            .collect::<HashMap<_, _>>();

        info!(
            subjects = rows.len(),
            columns = values.len(),
            events = self.event_count,
            "built rating histogram"
        );

        RatingHistogram {
            values,
            rows,
            event_count: self.event_count,
        }
    }
}

/// One-shot aggregation over a fully loaded log
pub fn aggregate(events: &[RatingEvent]) -> RatingHistogram {
    let mut builder = RatingHistogramBuilder::new();
    builder.observe(events);
    builder.finish()
}

/// Left-join histogram counts onto canonical movies by metadata id
pub fn join_ratings(movies: Vec<CanonicalEntityRecord>, histogram: &RatingHistogram) -> RatedMovieTable {
    let rows = movies
        .into_iter()
        .map(|movie| {
            let rating_counts = histogram.counts_for(movie.kaggle_id);
            RatedMovie {
                movie,
                rating_counts,
            }
        })
        .collect();

    let table = RatedMovieTable {
        rating_columns: histogram.column_names(),
        rows,
    };
    RatingsMetrics::record_join(table.len(), table.rating_columns.len());
    table
}
