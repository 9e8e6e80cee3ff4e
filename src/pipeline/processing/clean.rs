use chrono::{DateTime, NaiveDate};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::domain::{RatingEvent, RawMetadataRow, RawRatingRow, TabularEntityRecord};
use crate::error::{EtlError, Result};
use crate::metrics::CleanMetrics;

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a column that must always be well-formed
fn strict<T: FromStr>(value: &Option<String>, column: &str, row: usize) -> Result<T> {
    let raw = present(value).unwrap_or_default();
    raw.parse()
        .map_err(|_| EtlError::schema_violation(column, row, raw))
}

/// Parse a column where blanks and junk simply mean "unknown"
fn lenient_f64(value: &Option<String>, column: &str, row: usize) -> Option<f64> {
    let raw = present(value)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!(column, row, value = raw, "unparseable numeric value treated as absent");
            None
        }
    }
}

fn lenient_date(value: &Option<String>, row: usize) -> Option<NaiveDate> {
    let raw = present(value)?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!(row, value = raw, "unparseable release_date treated as absent");
            None
        }
    }
}

/// A present adult flag must be literally `False`; corrupted rows carry free
/// text there and are dropped with the adult ones. Rows without the flag,
/// including files that lack the column, are kept.
fn is_family_safe(row: &RawMetadataRow) -> bool {
    present(&row.adult).map_or(true, |flag| flag.eq_ignore_ascii_case("false"))
}

fn is_truthy(value: &Option<String>) -> bool {
    present(value).is_some_and(|flag| flag.eq_ignore_ascii_case("true"))
}

/// Coerce metadata rows into typed records.
///
/// Adult rows are removed first. `id`, `budget` and `popularity` must convert
/// for every remaining row; one failure fails the whole batch.
pub fn clean_metadata(rows: Vec<RawMetadataRow>) -> Result<Vec<TabularEntityRecord>> {
    let input_count = rows.len();
    let mut records = Vec::with_capacity(input_count);

    let unflagged = rows.iter().filter(|row| present(&row.adult).is_none()).count();
    if unflagged > 0 {
        warn!(unflagged, input_count, "metadata rows without an adult flag are kept");
    }

    for (row_index, row) in rows.into_iter().enumerate() {
        if !is_family_safe(&row) {
            continue;
        }

        let id: i64 = strict(&row.id, "id", row_index)?;
        let budget: i64 = strict(&row.budget, "budget", row_index)?;
        let popularity: f64 = strict(&row.popularity, "popularity", row_index)?;
        let revenue = lenient_f64(&row.revenue, "revenue", row_index);
        let runtime = lenient_f64(&row.runtime, "runtime", row_index);
        let vote_average = lenient_f64(&row.vote_average, "vote_average", row_index);
        let vote_count = lenient_f64(&row.vote_count, "vote_count", row_index);
        let video = is_truthy(&row.video);
        let release_date = lenient_date(&row.release_date, row_index);

        records.push(TabularEntityRecord {
            id,
            imdb_id: text(row.imdb_id),
            title: text(row.title),
            original_title: text(row.original_title),
            tagline: text(row.tagline),
            belongs_to_collection: text(row.belongs_to_collection),
            homepage: text(row.homepage),
            overview: text(row.overview),
            genres: text(row.genres),
            original_language: text(row.original_language),
            spoken_languages: text(row.spoken_languages),
            production_companies: text(row.production_companies),
            production_countries: text(row.production_countries),
            status: text(row.status),
            poster_path: text(row.poster_path),
            budget,
            popularity,
            revenue,
            runtime,
            vote_average,
            vote_count,
            video,
            release_date,
        });
    }

    info!(
        input_count,
        kept = records.len(),
        dropped = input_count - records.len(),
        "cleaned metadata rows"
    );
    CleanMetrics::record_metadata(input_count, records.len());
    Ok(records)
}

/// Coerce rating rows into typed events; `offset` is the index of the first
/// row within the whole log and is only used to locate errors.
pub fn clean_ratings(rows: Vec<RawRatingRow>, offset: usize) -> Result<Vec<RatingEvent>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let row_index = offset + i;
            let user_id = parse_rating_field(&row.user_id, "userId", row_index)?;
            let movie_id = parse_rating_field(&row.movie_id, "movieId", row_index)?;
            let rating: f64 = parse_rating_field(&row.rating, "rating", row_index)?;
            if !rating.is_finite() {
                return Err(EtlError::schema_violation("rating", row_index, row.rating));
            }
            let seconds: i64 = parse_rating_field(&row.timestamp, "timestamp", row_index)?;
            let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
                EtlError::schema_violation("timestamp", row_index, row.timestamp.clone())
            })?;

            Ok(RatingEvent {
                user_id,
                movie_id,
                rating,
                timestamp,
            })
        })
        .collect()
}

fn parse_rating_field<T: FromStr>(value: &str, column: &str, row: usize) -> Result<T> {
    let raw = value.trim();
    raw.parse()
        .map_err(|_| EtlError::schema_violation(column, row, raw))
}
