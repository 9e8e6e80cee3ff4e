//! Record shapes flowing through the ETL, from raw source rows to the published table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::PUBLISHED_COLUMNS;

/// A field value as it appears in the encyclopedia dump, before any schema is imposed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<RawValue>),
    Map(BTreeMap<String, RawValue>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Text content of the value, with list items joined by single spaces.
    ///
    /// Numbers, booleans and maps are not text and yield `None`, as does a
    /// list without any text items.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::List(items) => {
                let parts: Vec<String> = items.iter().filter_map(RawValue::as_text).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
            _ => None,
        }
    }

    /// Rendering used when the value is written into a flat table cell
    pub fn to_cell(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
            RawValue::List(_) | RawValue::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// One encyclopedia entry; the key set varies from record to record
pub type RawEntityRecord = BTreeMap<String, RawValue>;

/// An encyclopedia entry after field unification and typed parsing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEntityRecord {
    pub imdb_id: String,
    pub imdb_link: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub director: RawValue,
    pub writers: Option<RawValue>,
    pub distributor: Option<RawValue>,
    pub country: Option<RawValue>,
    pub producers: Option<RawValue>,
    pub composers: Option<RawValue>,
    pub editors: Option<RawValue>,
    pub starring: Option<RawValue>,
    pub cinematography: Option<RawValue>,
    pub based_on: Option<RawValue>,
    pub language: Option<RawValue>,
    pub production_companies: Option<RawValue>,
    /// Alternate titles keyed by the field name they were found under
    pub alt_titles: Option<BTreeMap<String, RawValue>>,
    pub release_date: Option<NaiveDate>,
    /// Minutes
    pub running_time: Option<f64>,
    /// Whole dollars
    pub budget: Option<f64>,
    /// Whole dollars
    pub box_office: Option<f64>,
    /// Retained fields without a dedicated slot
    pub extra: BTreeMap<String, RawValue>,
}

/// One row of the metadata CSV exactly as read; every column is text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadataRow {
    pub adult: Option<String>,
    pub belongs_to_collection: Option<String>,
    pub budget: Option<String>,
    pub genres: Option<String>,
    pub homepage: Option<String>,
    pub id: Option<String>,
    pub imdb_id: Option<String>,
    pub original_language: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub popularity: Option<String>,
    pub poster_path: Option<String>,
    pub production_companies: Option<String>,
    pub production_countries: Option<String>,
    pub release_date: Option<String>,
    pub revenue: Option<String>,
    pub runtime: Option<String>,
    pub spoken_languages: Option<String>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub title: Option<String>,
    pub video: Option<String>,
    pub vote_average: Option<String>,
    pub vote_count: Option<String>,
}

/// A metadata row with typed columns; adult rows never reach this shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularEntityRecord {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub tagline: Option<String>,
    pub belongs_to_collection: Option<String>,
    pub homepage: Option<String>,
    pub overview: Option<String>,
    pub genres: Option<String>,
    pub original_language: Option<String>,
    pub spoken_languages: Option<String>,
    pub production_companies: Option<String>,
    pub production_countries: Option<String>,
    pub status: Option<String>,
    pub poster_path: Option<String>,
    pub budget: i64,
    pub popularity: f64,
    pub revenue: Option<f64>,
    pub runtime: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub video: bool,
    pub release_date: Option<NaiveDate>,
}

/// One line of the ratings log as read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRatingRow {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "movieId")]
    pub movie_id: String,
    pub rating: String,
    pub timestamp: String,
}

/// A single rating event with typed fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingEvent {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f64,
    pub timestamp: DateTime<Utc>,
}

/// The reconciled movie row, fields in published column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntityRecord {
    pub imdb_id: String,
    pub kaggle_id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub tagline: Option<String>,
    pub belongs_to_collection: Option<String>,
    pub wikipedia_url: Option<String>,
    pub imdb_link: String,
    pub runtime: Option<f64>,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub popularity: f64,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub genres: Option<String>,
    pub original_language: Option<String>,
    pub overview: Option<String>,
    pub spoken_languages: Option<String>,
    pub country: Option<RawValue>,
    pub production_companies: Option<String>,
    pub production_countries: Option<String>,
    pub distributor: Option<RawValue>,
    pub producers: Option<RawValue>,
    pub director: RawValue,
    pub starring: Option<RawValue>,
    pub cinematography: Option<RawValue>,
    pub editors: Option<RawValue>,
    pub writers: Option<RawValue>,
    pub composers: Option<RawValue>,
    pub based_on: Option<RawValue>,
}

fn text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

fn raw_cell(value: &Option<RawValue>) -> String {
    value.as_ref().map(RawValue::to_cell).unwrap_or_default()
}

impl CanonicalEntityRecord {
    /// Cell values aligned with `PUBLISHED_COLUMNS`
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.imdb_id.clone(),
            self.kaggle_id.to_string(),
            text_cell(&self.title),
            text_cell(&self.original_title),
            text_cell(&self.tagline),
            text_cell(&self.belongs_to_collection),
            text_cell(&self.wikipedia_url),
            self.imdb_link.clone(),
            number_cell(self.runtime),
            number_cell(self.budget),
            number_cell(self.revenue),
            self.release_date.map(|d| d.to_string()).unwrap_or_default(),
            self.popularity.to_string(),
            number_cell(self.vote_average),
            number_cell(self.vote_count),
            text_cell(&self.genres),
            text_cell(&self.original_language),
            text_cell(&self.overview),
            text_cell(&self.spoken_languages),
            raw_cell(&self.country),
            text_cell(&self.production_companies),
            text_cell(&self.production_countries),
            raw_cell(&self.distributor),
            raw_cell(&self.producers),
            self.director.to_cell(),
            raw_cell(&self.starring),
            raw_cell(&self.cinematography),
            raw_cell(&self.editors),
            raw_cell(&self.writers),
            raw_cell(&self.composers),
            raw_cell(&self.based_on),
        ]
    }
}

/// A canonical movie with its rating histogram counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedMovie {
    pub movie: CanonicalEntityRecord,
    /// Counts aligned with `RatedMovieTable::rating_columns`
    pub rating_counts: Vec<u64>,
}

/// The final table handed to persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatedMovieTable {
    pub rating_columns: Vec<String>,
    pub rows: Vec<RatedMovie>,
}

impl RatedMovieTable {
    pub fn header(&self) -> Vec<String> {
        PUBLISHED_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(self.rating_columns.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RatedMovie {
    pub fn cells(&self) -> Vec<String> {
        let mut cells = self.movie.cells();
        cells.extend(self.rating_counts.iter().map(u64::to_string));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_deserializes_mixed_shapes() {
        let record: RawEntityRecord = serde_json::from_str(
            r#"{"title": "Heat", "year": 1995, "Starring": ["Al Pacino", "Robert De Niro"],
                "Japanese": {"Kanji": "ヒート"}, "Budget": null, "video": false}"#,
        )
        .unwrap();

        assert_eq!(record["title"], RawValue::from("Heat"));
        assert_eq!(record["year"], RawValue::Number(1995.0));
        assert!(matches!(record["Starring"], RawValue::List(_)));
        assert!(matches!(record["Japanese"], RawValue::Map(_)));
        assert!(record["Budget"].is_null());
        assert_eq!(record["video"], RawValue::Bool(false));
    }

    #[test]
    fn test_as_text_joins_lists_and_rejects_non_text() {
        let list = RawValue::List(vec!["$5 million".into(), RawValue::Null, "(est.)".into()]);
        assert_eq!(list.as_text().as_deref(), Some("$5 million (est.)"));
        assert_eq!(RawValue::Number(12.0).as_text(), None);
        assert_eq!(RawValue::List(vec![RawValue::Null]).as_text(), None);
    }

    #[test]
    fn test_published_cells_align_with_schema() {
        let movie = CanonicalEntityRecord {
            imdb_id: "tt0113277".to_string(),
            kaggle_id: 949,
            title: Some("Heat".to_string()),
            original_title: None,
            tagline: None,
            belongs_to_collection: None,
            wikipedia_url: None,
            imdb_link: "https://www.imdb.com/title/tt0113277/".to_string(),
            runtime: Some(170.0),
            budget: Some(60_000_000.0),
            revenue: None,
            release_date: NaiveDate::from_ymd_opt(1995, 12, 15),
            popularity: 17.9,
            vote_average: None,
            vote_count: None,
            genres: None,
            original_language: Some("en".to_string()),
            overview: None,
            spoken_languages: None,
            country: None,
            production_companies: None,
            production_countries: None,
            distributor: None,
            producers: None,
            director: "Michael Mann".into(),
            starring: Some(RawValue::List(vec!["Al Pacino".into()])),
            cinematography: None,
            editors: None,
            writers: None,
            composers: None,
            based_on: None,
        };

        let cells = movie.cells();
        assert_eq!(cells.len(), PUBLISHED_COLUMNS.len());
        assert_eq!(cells[1], "949");
        assert_eq!(cells[11], "1995-12-15");
        assert_eq!(cells[24], "Michael Mann");
        assert_eq!(cells[25], r#"["Al Pacino"]"#);

        let table = RatedMovieTable {
            rating_columns: vec!["rating_4.0".to_string()],
            rows: vec![RatedMovie {
                movie,
                rating_counts: vec![3],
            }],
        };
        assert_eq!(table.header().len(), PUBLISHED_COLUMNS.len() + 1);
        assert_eq!(&table.header()[..PUBLISHED_COLUMNS.len()], PUBLISHED_COLUMNS);
        assert_eq!(table.rows[0].cells().last().map(String::as_str), Some("3"));
    }
}
