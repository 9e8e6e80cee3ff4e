use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::PolicyConfig;
use crate::domain::{CanonicalEntityRecord, NormalizedEntityRecord, RawValue, TabularEntityRecord};
use crate::metrics::ReconcileMetrics;

/// A concept described by both sources under different columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DuplicatedConcept {
    Title,
    ReleaseDate,
    Language,
    ProductionCompanies,
    Runtime,
    Budget,
    Revenue,
}

/// How the surviving value of a duplicated concept is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// Metadata value wins; the encyclopedia column is dropped
    KeepKaggle,
    /// Encyclopedia value wins; the metadata column is dropped
    KeepWiki,
    /// Metadata value wins unless it is zero, its marker for "unknown"
    FillZerosFromWiki,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictRule {
    pub concept: DuplicatedConcept,
    pub resolution: Resolution,
}

/// Which side survives for each duplicated concept
pub const CONFLICT_POLICY: &[ConflictRule] = &[
    ConflictRule {
        concept: DuplicatedConcept::Title,
        resolution: Resolution::KeepKaggle,
    },
    ConflictRule {
        concept: DuplicatedConcept::ReleaseDate,
        resolution: Resolution::KeepKaggle,
    },
    ConflictRule {
        concept: DuplicatedConcept::Language,
        resolution: Resolution::KeepKaggle,
    },
    ConflictRule {
        concept: DuplicatedConcept::ProductionCompanies,
        resolution: Resolution::KeepKaggle,
    },
    ConflictRule {
        concept: DuplicatedConcept::Runtime,
        resolution: Resolution::FillZerosFromWiki,
    },
    ConflictRule {
        concept: DuplicatedConcept::Budget,
        resolution: Resolution::FillZerosFromWiki,
    },
    ConflictRule {
        concept: DuplicatedConcept::Revenue,
        resolution: Resolution::FillZerosFromWiki,
    },
];

/// Values for which the metadata source writes zero instead of leaving a blank
pub trait UnknownMarker {
    fn is_unknown_marker(&self) -> bool {
        false
    }
}

impl UnknownMarker for f64 {
    fn is_unknown_marker(&self) -> bool {
        *self == 0.0
    }
}

impl UnknownMarker for String {}
impl UnknownMarker for NaiveDate {}

/// Apply one resolution to a (wiki, kaggle) value pair
pub fn resolve<T: UnknownMarker>(resolution: Resolution, wiki: Option<T>, kaggle: Option<T>) -> Option<T> {
    match resolution {
        Resolution::KeepKaggle => kaggle,
        Resolution::KeepWiki => wiki,
        Resolution::FillZerosFromWiki => match kaggle {
            Some(value) if value.is_unknown_marker() => wiki,
            other => other,
        },
    }
}

/// Release-date plausibility check for pairs joined on the same identifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MismatchPolicy {
    pub modern_cutoff: NaiveDate,
    pub early_cutoff: NaiveDate,
}

impl Default for MismatchPolicy {
    fn default() -> Self {
        let defaults = PolicyConfig::default();
        Self {
            modern_cutoff: defaults.modern_cutoff,
            early_cutoff: defaults.early_cutoff,
        }
    }
}

impl MismatchPolicy {
    /// True when one release date is after the modern cutoff while the other
    /// is before the early one. Missing dates never flag a pair.
    pub fn is_implausible(&self, wiki: Option<NaiveDate>, kaggle: Option<NaiveDate>) -> bool {
        let (Some(wiki), Some(kaggle)) = (wiki, kaggle) else {
            return false;
        };
        let crossed = |late: NaiveDate, early: NaiveDate| {
            late > self.modern_cutoff && early < self.early_cutoff
        };
        crossed(wiki, kaggle) || crossed(kaggle, wiki)
    }
}

/// The two source rows paired by a shared identifier
#[derive(Debug, Clone)]
pub struct JoinedRecord {
    pub wiki: NormalizedEntityRecord,
    pub kaggle: TabularEntityRecord,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutput {
    pub records: Vec<CanonicalEntityRecord>,
    /// Pairs produced by the join, before the mismatch filter
    pub joined_count: usize,
    /// Pairs removed as identifier collisions
    pub mismatch_count: usize,
}

/// Merges normalized encyclopedia records with cleaned metadata records
pub struct Reconciler {
    pub policy: Vec<ConflictRule>,
    pub mismatch: MismatchPolicy,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            policy: CONFLICT_POLICY.to_vec(),
            mismatch: MismatchPolicy::default(),
        }
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mismatch_policy(mismatch: MismatchPolicy) -> Self {
        Self {
            mismatch,
            ..Self::default()
        }
    }

    fn resolution_for(&self, concept: DuplicatedConcept) -> Resolution {
        self.policy
            .iter()
            .find(|rule| rule.concept == concept)
            .map(|rule| rule.resolution)
            .unwrap_or(Resolution::KeepKaggle)
    }

    /// Inner join on the external identifier, in encyclopedia order. A wiki
    /// record matching several metadata rows yields one pair per row.
    pub fn join(
        &self,
        wiki: Vec<NormalizedEntityRecord>,
        kaggle: Vec<TabularEntityRecord>,
    ) -> Vec<JoinedRecord> {
        let mut by_id: HashMap<String, Vec<TabularEntityRecord>> = HashMap::new();
        for record in kaggle {
            if let Some(imdb_id) = record.imdb_id.clone() {
                by_id.entry(imdb_id).or_default().push(record);
            }
        }

        let mut joined = Vec::new();
        for record in wiki {
            let Some(matches) = by_id.get(&record.imdb_id) else {
                continue;
            };
            for kaggle in matches {
                joined.push(JoinedRecord {
                    wiki: record.clone(),
                    kaggle: kaggle.clone(),
                });
            }
        }
        joined
    }

    pub fn reconcile(
        &self,
        wiki: Vec<NormalizedEntityRecord>,
        kaggle: Vec<TabularEntityRecord>,
    ) -> ReconcileOutput {
        let (wiki_count, kaggle_count) = (wiki.len(), kaggle.len());
        let joined = self.join(wiki, kaggle);
        let joined_count = joined.len();

        let plausible: Vec<JoinedRecord> = joined
            .into_iter()
            .filter(|pair| {
                let implausible = self
                    .mismatch
                    .is_implausible(pair.wiki.release_date, pair.kaggle.release_date);
                if implausible {
                    debug!(
                        imdb_id = %pair.wiki.imdb_id,
                        wiki_release = ?pair.wiki.release_date,
                        kaggle_release = ?pair.kaggle.release_date,
                        "dropping mismatched pair"
                    );
                }
                !implausible
            })
            .collect();
        let mismatch_count = joined_count - plausible.len();

        let records: Vec<CanonicalEntityRecord> =
            plausible.into_iter().map(|pair| self.merge(pair)).collect();

        info!(
            wiki_count,
            kaggle_count,
            joined_count,
            mismatch_count,
            reconciled = records.len(),
            "reconciled sources"
        );

        let output = ReconcileOutput {
            records,
            joined_count,
            mismatch_count,
        };
        ReconcileMetrics::record(&output);
        output
    }

    /// Resolve every duplicated concept and project onto the published schema
    pub fn merge(&self, pair: JoinedRecord) -> CanonicalEntityRecord {
        let JoinedRecord { wiki, kaggle } = pair;

        let title = resolve(
            self.resolution_for(DuplicatedConcept::Title),
            wiki.title,
            kaggle.title,
        );
        let release_date = resolve(
            self.resolution_for(DuplicatedConcept::ReleaseDate),
            wiki.release_date,
            kaggle.release_date,
        );
        let original_language = resolve(
            self.resolution_for(DuplicatedConcept::Language),
            wiki.language.as_ref().and_then(RawValue::as_text),
            kaggle.original_language,
        );
        let production_companies = resolve(
            self.resolution_for(DuplicatedConcept::ProductionCompanies),
            wiki.production_companies.as_ref().and_then(RawValue::as_text),
            kaggle.production_companies,
        );
        let runtime = resolve(
            self.resolution_for(DuplicatedConcept::Runtime),
            wiki.running_time,
            kaggle.runtime,
        );
        let budget = resolve(
            self.resolution_for(DuplicatedConcept::Budget),
            wiki.budget,
            Some(kaggle.budget as f64),
        );
        let revenue = resolve(
            self.resolution_for(DuplicatedConcept::Revenue),
            wiki.box_office,
            kaggle.revenue,
        );

        CanonicalEntityRecord {
            imdb_id: wiki.imdb_id,
            kaggle_id: kaggle.id,
            title,
            original_title: kaggle.original_title,
            tagline: kaggle.tagline,
            belongs_to_collection: kaggle.belongs_to_collection,
            wikipedia_url: wiki.url,
            imdb_link: wiki.imdb_link,
            runtime,
            budget,
            revenue,
            release_date,
            popularity: kaggle.popularity,
            vote_average: kaggle.vote_average,
            vote_count: kaggle.vote_count,
            genres: kaggle.genres,
            original_language,
            overview: kaggle.overview,
            spoken_languages: kaggle.spoken_languages,
            country: wiki.country,
            production_companies,
            production_countries: kaggle.production_countries,
            distributor: wiki.distributor,
            producers: wiki.producers,
            director: wiki.director,
            starring: wiki.starring,
            cinematography: wiki.cinematography,
            editors: wiki.editors,
            writers: wiki.writers,
            composers: wiki.composers,
            based_on: wiki.based_on,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn wiki_record(imdb_id: &str) -> NormalizedEntityRecord {
        NormalizedEntityRecord {
            imdb_id: imdb_id.to_string(),
            imdb_link: format!("https://www.imdb.com/title/{}/", imdb_id),
            url: Some(format!("https://en.wikipedia.org/wiki/{}", imdb_id)),
            title: Some("Wiki Title".to_string()),
            director: "Wiki Director".into(),
            writers: None,
            distributor: Some("Wiki Pictures".into()),
            country: Some("United States".into()),
            producers: None,
            composers: None,
            editors: None,
            starring: None,
            cinematography: None,
            based_on: None,
            language: Some("English".into()),
            production_companies: Some("Wiki Studio".into()),
            alt_titles: None,
            release_date: Some(date(1995, 6, 1)),
            running_time: Some(120.0),
            budget: Some(5_000_000.0),
            box_office: Some(20_000_000.0),
            extra: BTreeMap::new(),
        }
    }

    pub(crate) fn kaggle_record(id: i64, imdb_id: &str) -> TabularEntityRecord {
        TabularEntityRecord {
            id,
            imdb_id: Some(imdb_id.to_string()),
            title: Some("Kaggle Title".to_string()),
            original_title: Some("Kaggle Original".to_string()),
            tagline: None,
            belongs_to_collection: None,
            homepage: None,
            overview: Some("Overview".to_string()),
            genres: None,
            original_language: Some("en".to_string()),
            spoken_languages: None,
            production_companies: Some("[{'name': 'Kaggle Studio'}]".to_string()),
            production_countries: None,
            status: None,
            poster_path: None,
            budget: 7_000_000,
            popularity: 9.5,
            revenue: Some(0.0),
            runtime: Some(95.0),
            vote_average: Some(6.8),
            vote_count: Some(120.0),
            video: false,
            release_date: Some(date(1995, 6, 2)),
        }
    }

    #[test]
    fn test_fill_policy_substitutes_zero_only() {
        let fill = Resolution::FillZerosFromWiki;
        assert_eq!(resolve(fill, Some(120.0), Some(0.0)), Some(120.0));
        assert_eq!(resolve(fill, Some(120.0), Some(95.0)), Some(95.0));
        assert_eq!(resolve(fill, Some(120.0), None), None);
        assert_eq!(resolve(fill, None, Some(0.0)), None);
        assert_eq!(
            resolve(Resolution::KeepKaggle, Some("a".to_string()), Some("b".to_string())),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_runtime_zero_is_filled_from_wiki() {
        let mut kaggle = kaggle_record(1, "tt0000001");
        kaggle.runtime = Some(0.0);
        let output = Reconciler::new().reconcile(vec![wiki_record("tt0000001")], vec![kaggle]);
        assert_eq!(output.records[0].runtime, Some(120.0));
    }

    #[test]
    fn test_nonzero_runtime_is_kept() {
        let output = Reconciler::new().reconcile(
            vec![wiki_record("tt0000001")],
            vec![kaggle_record(1, "tt0000001")],
        );
        assert_eq!(output.records[0].runtime, Some(95.0));
    }

    #[test]
    fn test_merge_prefers_metadata_columns() {
        let movie = Reconciler::new().merge(JoinedRecord {
            wiki: wiki_record("tt0000001"),
            kaggle: kaggle_record(11, "tt0000001"),
        });

        assert_eq!(movie.kaggle_id, 11);
        assert_eq!(movie.title.as_deref(), Some("Kaggle Title"));
        assert_eq!(movie.release_date, Some(date(1995, 6, 2)));
        assert_eq!(movie.original_language.as_deref(), Some("en"));
        assert_eq!(
            movie.production_companies.as_deref(),
            Some("[{'name': 'Kaggle Studio'}]")
        );
        assert_eq!(movie.budget, Some(7_000_000.0));
        // metadata revenue is zero, so the box office figure survives
        assert_eq!(movie.revenue, Some(20_000_000.0));
        assert_eq!(movie.director, RawValue::from("Wiki Director"));
        assert_eq!(movie.distributor, Some(RawValue::from("Wiki Pictures")));
        assert!(movie.wikipedia_url.is_some());
    }

    #[test]
    fn test_zero_budget_is_filled() {
        let mut kaggle = kaggle_record(1, "tt0000001");
        kaggle.budget = 0;
        let movie = Reconciler::new().merge(JoinedRecord {
            wiki: wiki_record("tt0000001"),
            kaggle,
        });
        assert_eq!(movie.budget, Some(5_000_000.0));
    }

    #[test]
    fn test_cross_mismatch_is_dropped() {
        let mut wiki = wiki_record("tt0000002");
        wiki.release_date = Some(date(2001, 1, 1));
        let mut kaggle = kaggle_record(2, "tt0000002");
        kaggle.release_date = Some(date(1950, 1, 1));

        let output = Reconciler::new().reconcile(
            vec![wiki_record("tt0000001"), wiki],
            vec![kaggle_record(1, "tt0000001"), kaggle],
        );

        assert_eq!(output.joined_count, 2);
        assert_eq!(output.mismatch_count, 1);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].imdb_id, "tt0000001");
    }

    #[test]
    fn test_mismatch_policy_is_symmetric_and_configurable() {
        let policy = MismatchPolicy::default();
        assert!(policy.is_implausible(Some(date(1950, 1, 1)), Some(date(2001, 1, 1))));
        assert!(!policy.is_implausible(Some(date(1980, 1, 1)), Some(date(2001, 1, 1))));
        assert!(!policy.is_implausible(None, Some(date(1950, 1, 1))));

        let strict = MismatchPolicy {
            modern_cutoff: date(1975, 1, 1),
            early_cutoff: date(1970, 1, 1),
        };
        assert!(strict.is_implausible(Some(date(1980, 1, 1)), Some(date(1960, 1, 1))));
    }

    #[test]
    fn test_join_is_inner_and_keeps_wiki_order() {
        let output = Reconciler::new().reconcile(
            vec![
                wiki_record("tt0000003"),
                wiki_record("tt0000009"),
                wiki_record("tt0000001"),
            ],
            vec![
                kaggle_record(1, "tt0000001"),
                kaggle_record(3, "tt0000003"),
                kaggle_record(4, "tt0000004"),
            ],
        );
        let ids: Vec<&str> = output.records.iter().map(|r| r.imdb_id.as_str()).collect();
        assert_eq!(ids, vec!["tt0000003", "tt0000001"]);
    }

    #[test]
    fn test_policy_table_covers_each_concept_once() {
        use std::collections::HashSet;
        let concepts: HashSet<DuplicatedConcept> =
            CONFLICT_POLICY.iter().map(|rule| rule.concept).collect();
        assert_eq!(concepts.len(), CONFLICT_POLICY.len());
        assert_eq!(concepts.len(), 7);
    }

    #[test]
    fn test_every_policy_rule_drives_merge() {
        let mut wiki = wiki_record("tt0000001");
        wiki.running_time = Some(120.0);
        let mut kaggle = kaggle_record(1, "tt0000001");
        kaggle.revenue = Some(30_000_000.0);

        for rule in CONFLICT_POLICY {
            let reconciler = Reconciler {
                policy: CONFLICT_POLICY
                    .iter()
                    .map(|r| ConflictRule {
                        resolution: if r.concept == rule.concept {
                            Resolution::KeepWiki
                        } else {
                            r.resolution
                        },
                        ..r.clone()
                    })
                    .collect(),
                mismatch: MismatchPolicy::default(),
            };
            let baseline = Reconciler::new().merge(JoinedRecord {
                wiki: wiki.clone(),
                kaggle: kaggle.clone(),
            });
            let flipped = reconciler.merge(JoinedRecord {
                wiki: wiki.clone(),
                kaggle: kaggle.clone(),
            });
            assert_ne!(baseline, flipped, "{:?} had no effect", rule.concept);
        }
    }

    #[test]
    fn test_policy_table_is_swappable() {
        let mut reconciler = Reconciler::new();
        for rule in reconciler.policy.iter_mut() {
            if rule.concept == DuplicatedConcept::Title {
                rule.resolution = Resolution::KeepWiki;
            }
        }
        let movie = reconciler.merge(JoinedRecord {
            wiki: wiki_record("tt0000001"),
            kaggle: kaggle_record(1, "tt0000001"),
        });
        assert_eq!(movie.title.as_deref(), Some("Wiki Title"));
    }
}
