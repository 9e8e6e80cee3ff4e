//! Field-name policy tables for the encyclopedia source and the published schema.
//! Kept as data so each table can be audited and tested apart from the code applying it.

// Fields that decide whether an encyclopedia record is a feature film
pub const DIRECTOR_FIELD: &str = "Director";
pub const DIRECTED_BY_FIELD: &str = "Directed by";
pub const IMDB_LINK_FIELD: &str = "imdb_link";
pub const EPISODE_COUNT_FIELD: &str = "No. of episodes";

/// Sub-mapping that collects every alternate-title field
pub const ALT_TITLES_FIELD: &str = "Alt titles";

/// Source fields holding alternate or translated titles
pub const ALT_TITLE_KEYS: &[&str] = &[
    "Also known as",
    "Arabic",
    "Cantonese",
    "Chinese",
    "French",
    "Hangul",
    "Hebrew",
    "Hepburn",
    "Japanese",
    "Literally",
    "Mandarin",
    "McCune–Reischauer",
    "Original title",
    "Polish",
    "Revised Romanization",
    "Romanized",
    "Russian",
    "Simplified",
    "Traditional",
    "Yiddish",
];

/// (source field, canonical field), applied in order; a later rule overwrites
/// a canonical field an earlier rule already filled
pub const RENAME_RULES: &[(&str, &str)] = &[
    ("Adaptation by", "Writer(s)"),
    ("Country of origin", "Country"),
    ("Directed by", "Director"),
    ("Distributed by", "Distributor"),
    ("Edited by", "Editor(s)"),
    ("Length", "Running time"),
    ("Original release", "Release date"),
    ("Music by", "Composer(s)"),
    ("Produced by", "Producer(s)"),
    ("Producer", "Producer(s)"),
    ("Productioncompanies ", "Production company(s)"),
    ("Productioncompany ", "Production company(s)"),
    ("Released", "Release date"),
    ("Screen story by", "Writer(s)"),
    ("Screenplay by", "Writer(s)"),
    ("Story by", "Writer(s)"),
    ("Theme music composer", "Composer(s)"),
    ("Written by", "Writer(s)"),
];

// Canonical encyclopedia fields
pub const URL_FIELD: &str = "url";
pub const TITLE_FIELD: &str = "title";
pub const WRITERS_FIELD: &str = "Writer(s)";
pub const DISTRIBUTOR_FIELD: &str = "Distributor";
pub const COUNTRY_FIELD: &str = "Country";
pub const PRODUCERS_FIELD: &str = "Producer(s)";
pub const COMPOSERS_FIELD: &str = "Composer(s)";
pub const EDITORS_FIELD: &str = "Editor(s)";
pub const STARRING_FIELD: &str = "Starring";
pub const CINEMATOGRAPHY_FIELD: &str = "Cinematography";
pub const BASED_ON_FIELD: &str = "Based on";
pub const LANGUAGE_FIELD: &str = "Language";
pub const PRODUCTION_COMPANIES_FIELD: &str = "Production company(s)";
pub const RELEASE_DATE_FIELD: &str = "Release date";
pub const RUNNING_TIME_FIELD: &str = "Running time";
pub const BUDGET_FIELD: &str = "Budget";
pub const BOX_OFFICE_FIELD: &str = "Box office";

/// Fields exempt from the null-rate column drop
pub const PROTECTED_FIELDS: &[&str] = &[IMDB_LINK_FIELD, DIRECTOR_FIELD];

/// Published movie columns, in order; rating count columns follow
pub const PUBLISHED_COLUMNS: &[&str] = &[
    "imdb_id",
    "kaggle_id",
    "title",
    "original_title",
    "tagline",
    "belongs_to_collection",
    "wikipedia_url",
    "imdb_link",
    "runtime",
    "budget",
    "revenue",
    "release_date",
    "popularity",
    "vote_average",
    "vote_count",
    "genres",
    "original_language",
    "overview",
    "spoken_languages",
    "country",
    "production_companies",
    "production_countries",
    "distributor",
    "producers",
    "director",
    "starring",
    "cinematography",
    "editors",
    "writers",
    "composers",
    "based_on",
];

/// Prefix of the per-value rating count columns
pub const RATING_COLUMN_PREFIX: &str = "rating_";

/// Header of persisted rating rows
pub const RATINGS_HEADER: &[&str] = &["userId", "movieId", "rating", "timestamp"];
