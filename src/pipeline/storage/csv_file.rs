use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

use super::Storage;
use crate::constants::RATINGS_HEADER;
use crate::domain::{RatedMovieTable, RatingEvent};
use crate::error::Result;

pub const MOVIES_FILE: &str = "movies.csv";
pub const RATINGS_FILE: &str = "ratings.csv";

/// File-backed storage writing one CSV per table under an output directory.
/// Existing files are appended to; the header is written only for a new file.
pub struct CsvFileStorage {
    dir: PathBuf,
}

impl CsvFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn movies_path(&self) -> PathBuf {
        self.dir.join(MOVIES_FILE)
    }

    pub fn ratings_path(&self) -> PathBuf {
        self.dir.join(RATINGS_FILE)
    }

    /// Open for append; the flag says whether a header is still needed
    fn open_append(path: &Path) -> Result<(csv::Writer<File>, bool)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok((writer, needs_header))
    }
}

#[async_trait]
impl Storage for CsvFileStorage {
    async fn append_movies(&self, table: &RatedMovieTable) -> Result<usize> {
        let path = self.movies_path();
        let (mut writer, needs_header) = Self::open_append(&path)?;
        if needs_header {
            writer.write_record(table.header())?;
        }
        for row in &table.rows {
            writer.write_record(row.cells())?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = table.len(), "appended movies");
        Ok(table.len())
    }

    async fn append_ratings(&self, events: &[RatingEvent]) -> Result<usize> {
        let (mut writer, needs_header) = Self::open_append(&self.ratings_path())?;
        if needs_header {
            writer.write_record(RATINGS_HEADER)?;
        }
        for event in events {
            writer.write_record([
                event.user_id.to_string(),
                event.movie_id.to_string(),
                event.rating.to_string(),
                event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(events.len())
    }
}
