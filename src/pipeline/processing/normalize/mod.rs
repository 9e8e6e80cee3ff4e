use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

use crate::constants::*;
use crate::domain::{NormalizedEntityRecord, RawEntityRecord, RawValue};
use crate::metrics::NormalizeMetrics;
use crate::pipeline::processing::parser::{
    currency_from_raw, duration_from_raw, release_date_from_raw,
};

static IMDB_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tt\d{7}").expect("built-in pattern must compile"));

/// Configuration for encyclopedia normalization
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Columns whose null fraction reaches this value are dropped
    pub null_rate_threshold: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            null_rate_threshold: 0.9,
        }
    }
}

/// Output of a normalization run along with what was filtered out
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedEntityRecord>,
    /// Columns that survived the null-rate rule, sorted
    pub retained_columns: Vec<String>,
    /// Columns dropped by the null-rate rule, sorted
    pub dropped_columns: Vec<String>,
    pub input_count: usize,
    /// Records removed as non-films (no director, no link, or episodic)
    pub filtered_count: usize,
    /// Records whose link carried no recognisable identifier
    pub missing_id_count: usize,
    /// Records collapsed onto an earlier record with the same identifier
    pub duplicate_count: usize,
}

/// Whether an encyclopedia record describes a feature film worth keeping
pub fn is_feature_film(record: &RawEntityRecord) -> bool {
    (record.contains_key(DIRECTOR_FIELD) || record.contains_key(DIRECTED_BY_FIELD))
        && record.contains_key(IMDB_LINK_FIELD)
        && !record.contains_key(EPISODE_COUNT_FIELD)
}

/// Collect alternate titles into one sub-mapping and merge field-name variants.
pub fn unify_fields(mut record: RawEntityRecord) -> RawEntityRecord {
    let alt_titles: BTreeMap<String, RawValue> = ALT_TITLE_KEYS
        .iter()
        .filter_map(|key| record.remove_entry(*key))
        .collect();
    if !alt_titles.is_empty() {
        debug!(count = alt_titles.len(), "collected alternate titles");
        record.insert(ALT_TITLES_FIELD.to_string(), RawValue::Map(alt_titles));
    }

    for (source, canonical) in RENAME_RULES {
        if let Some(value) = record.remove(*source) {
            record.insert(canonical.to_string(), value);
        }
    }

    record
}

/// Extract the `tt` + 7 digit identifier embedded in a link field
pub fn extract_imdb_id(link: &RawValue) -> Option<String> {
    let text = link.as_text()?;
    IMDB_ID.find(&text).map(|m| m.as_str().to_string())
}

/// Normalizer for the semi-structured encyclopedia dump
pub struct WikiNormalizer {
    pub config: NormalizerConfig,
}

impl Default for WikiNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl WikiNormalizer {
    pub fn new() -> Self {
        Self {
            config: NormalizerConfig::default(),
        }
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, records: Vec<RawEntityRecord>) -> NormalizedBatch {
        let input_count = records.len();

        let films: Vec<RawEntityRecord> = records.into_iter().filter(is_feature_film).collect();
        let filtered_count = input_count - films.len();
        info!(input_count, kept = films.len(), "filtered encyclopedia records");

        let mut seen = HashSet::new();
        let mut missing_id_count = 0;
        let mut duplicate_count = 0;
        let mut unified: Vec<(String, RawEntityRecord)> = Vec::with_capacity(films.len());

        for record in films.into_iter().map(unify_fields) {
            let Some(imdb_id) = record.get(IMDB_LINK_FIELD).and_then(extract_imdb_id) else {
                missing_id_count += 1;
                continue;
            };
            if !seen.insert(imdb_id.clone()) {
                duplicate_count += 1;
                continue;
            }
            unified.push((imdb_id, record));
        }
        debug!(missing_id_count, duplicate_count, "resolved external identifiers");

        let (retained_columns, dropped_columns) = self.partition_columns(&unified);
        if !dropped_columns.is_empty() {
            info!(
                dropped = dropped_columns.len(),
                retained = retained_columns.len(),
                "dropped sparse columns"
            );
        }

        let dropped: HashSet<&str> = dropped_columns.iter().map(String::as_str).collect();
        let records = unified
            .into_iter()
            .map(|(imdb_id, mut record)| {
                record.retain(|key, _| !dropped.contains(key.as_str()));
                into_normalized(imdb_id, record)
            })
            .collect();

        let batch = NormalizedBatch {
            records,
            retained_columns,
            dropped_columns,
            input_count,
            filtered_count,
            missing_id_count,
            duplicate_count,
        };
        NormalizeMetrics::record_batch(&batch);
        batch
    }

    /// Split the column union into (retained, dropped) by null rate.
    /// A column survives only while its null count stays below
    /// `threshold * record_count`.
    fn partition_columns(&self, records: &[(String, RawEntityRecord)]) -> (Vec<String>, Vec<String>) {
        let total = records.len();
        let mut filled: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, record) in records {
            for (key, value) in record {
                let count = filled.entry(key.as_str()).or_insert(0);
                if !value.is_null() {
                    *count += 1;
                }
            }
        }

        let limit = self.config.null_rate_threshold * total as f64;
        let protected: BTreeSet<&str> = PROTECTED_FIELDS.iter().copied().collect();
        let (retained, dropped): (Vec<_>, Vec<_>) = filled
            .into_iter()
            .partition(|(key, count)| protected.contains(key) || ((total - count) as f64) < limit);

        (
            retained.into_iter().map(|(k, _)| k.to_string()).collect(),
            dropped.into_iter().map(|(k, _)| k.to_string()).collect(),
        )
    }
}

fn into_normalized(imdb_id: String, mut record: RawEntityRecord) -> NormalizedEntityRecord {
    let mut take = |key: &str| record.remove(key).filter(|v| !v.is_null());

    let imdb_link = take(IMDB_LINK_FIELD)
        .and_then(|v| v.as_text())
        .unwrap_or_default();
    let url = take(URL_FIELD).and_then(|v| v.as_text());
    let title = take(TITLE_FIELD).and_then(|v| v.as_text());
    let director = take(DIRECTOR_FIELD).unwrap_or(RawValue::Null);
    let writers = take(WRITERS_FIELD);
    let distributor = take(DISTRIBUTOR_FIELD);
    let country = take(COUNTRY_FIELD);
    let producers = take(PRODUCERS_FIELD);
    let composers = take(COMPOSERS_FIELD);
    let editors = take(EDITORS_FIELD);
    let starring = take(STARRING_FIELD);
    let cinematography = take(CINEMATOGRAPHY_FIELD);
    let based_on = take(BASED_ON_FIELD);
    let language = take(LANGUAGE_FIELD);
    let production_companies = take(PRODUCTION_COMPANIES_FIELD);
    let alt_titles = match take(ALT_TITLES_FIELD) {
        Some(RawValue::Map(titles)) => Some(titles),
        _ => None,
    };
    let release_date = take(RELEASE_DATE_FIELD).as_ref().and_then(release_date_from_raw);
    let running_time = take(RUNNING_TIME_FIELD)
        .as_ref()
        .and_then(duration_from_raw)
        .map(f64::from);
    let budget = take(BUDGET_FIELD).as_ref().and_then(currency_from_raw);
    let box_office = take(BOX_OFFICE_FIELD).as_ref().and_then(currency_from_raw);

    NormalizedEntityRecord {
        imdb_id,
        imdb_link,
        url,
        title,
        director,
        writers,
        distributor,
        country,
        producers,
        composers,
        editors,
        starring,
        cinematography,
        based_on,
        language,
        production_companies,
        alt_titles,
        release_date,
        running_time,
        budget,
        box_office,
        extra: record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(pairs: &[(&str, RawValue)]) -> RawEntityRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn film(id: u32) -> RawEntityRecord {
        record(&[
            ("title", "Some Film".into()),
            ("Directed by", "A. Director".into()),
            (
                "imdb_link",
                RawValue::Text(format!("https://www.imdb.com/title/tt{:07}/", id)),
            ),
        ])
    }

    #[test]
    fn test_is_feature_film() {
        assert!(is_feature_film(&film(1)));

        let mut no_link = film(1);
        no_link.remove("imdb_link");
        assert!(!is_feature_film(&no_link));

        let mut series = film(1);
        series.insert("No. of episodes".to_string(), "22".into());
        assert!(!is_feature_film(&series));

        let no_director = record(&[("imdb_link", "tt0000001".into())]);
        assert!(!is_feature_film(&no_director));
    }

    #[test]
    fn test_unify_renames_variants() {
        let unified = unify_fields(record(&[
            ("Directed by", "Jane Doe".into()),
            ("Written by", "John Roe".into()),
        ]));

        let keys: Vec<&str> = unified.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Director", "Writer(s)"]);
        assert_eq!(unified["Director"], RawValue::from("Jane Doe"));
        assert_eq!(unified["Writer(s)"], RawValue::from("John Roe"));
    }

    #[test]
    fn test_unify_collects_alt_titles_under_original_keys() {
        let unified = unify_fields(record(&[
            ("Director", "Jane Doe".into()),
            ("French", "Le Film".into()),
            ("Japanese", "映画".into()),
            ("Hepburn", "Eiga".into()),
            ("Also known as", "The Film".into()),
            ("Original title", "Film".into()),
        ]));

        assert_eq!(unified.len(), 2);
        match &unified[ALT_TITLES_FIELD] {
            RawValue::Map(titles) => {
                assert_eq!(titles.len(), 5);
                assert_eq!(titles["French"], RawValue::from("Le Film"));
                assert!(titles.contains_key("Also known as"));
            }
            other => panic!("expected a sub-mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_unify_later_variant_wins() {
        let unified = unify_fields(record(&[
            ("Produced by", "First".into()),
            ("Producer", "Second".into()),
        ]));
        assert_eq!(unified["Producer(s)"], RawValue::from("Second"));
        assert_eq!(unified.len(), 1);
    }

    #[test]
    fn test_extract_imdb_id() {
        let link = RawValue::from("https://www.imdb.com/title/tt1234567/?ref=x");
        assert_eq!(extract_imdb_id(&link).as_deref(), Some("tt1234567"));
        assert_eq!(extract_imdb_id(&RawValue::from("https://imdb.com/")), None);
    }

    #[test]
    fn test_normalize_dedupes_and_parses() {
        let mut first = film(42);
        first.insert("Box office".to_string(), "$1.2 million".into());
        first.insert("Running time".to_string(), "2 hours 15 min".into());
        first.insert("Released".to_string(), "January 5, 1999".into());
        first.insert("Budget".to_string(), RawValue::List(vec!["$3 million".into()]));
        let mut duplicate = film(42);
        duplicate.insert("title".to_string(), "Duplicate".into());
        let mut no_id = film(1);
        no_id.insert("imdb_link".to_string(), "https://www.imdb.com/".into());

        let batch = WikiNormalizer::new().normalize(vec![first, duplicate, no_id]);

        assert_eq!(batch.input_count, 3);
        assert_eq!(batch.duplicate_count, 1);
        assert_eq!(batch.missing_id_count, 1);
        assert_eq!(batch.records.len(), 1);

        let movie = &batch.records[0];
        assert_eq!(movie.imdb_id, "tt0000042");
        assert_eq!(movie.title.as_deref(), Some("Some Film"));
        assert_eq!(movie.director, RawValue::from("A. Director"));
        assert_eq!(movie.box_office, Some(1_200_000.0));
        assert_eq!(movie.budget, Some(3_000_000.0));
        assert_eq!(movie.running_time, Some(135.0));
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(1999, 1, 5));
        assert!(movie.extra.is_empty());
    }

    #[test]
    fn test_sparse_columns_are_dropped() {
        let records: Vec<RawEntityRecord> = (0..1000)
            .map(|i| {
                let mut r = film(i);
                if i % 20 == 0 {
                    r.insert("Label".to_string(), "Rare".into());
                }
                if i % 20 < 3 {
                    r.insert("Starring".to_string(), "Someone".into());
                }
                r
            })
            .collect();

        let batch = WikiNormalizer::new().normalize(records);

        assert_eq!(batch.dropped_columns, vec!["Label".to_string()]);
        assert!(batch.retained_columns.contains(&"Starring".to_string()));
        assert!(batch.records.iter().all(|r| !r.extra.contains_key("Label")));
        assert_eq!(
            batch.records.iter().filter(|r| r.starring.is_some()).count(),
            150
        );
    }

    #[test]
    fn test_null_values_count_as_missing() {
        let records: Vec<RawEntityRecord> = (0..10)
            .map(|i| {
                let mut r = film(i);
                r.insert("Narrated by".to_string(), RawValue::Null);
                r
            })
            .collect();

        let batch = WikiNormalizer::new().normalize(records);
        assert!(batch.dropped_columns.contains(&"Narrated by".to_string()));
    }
}
