// Pipeline ingestion: reading the three source files into raw row shapes

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::domain::{RawEntityRecord, RawMetadataRow, RawRatingRow};
use crate::error::Result;

/// Load the encyclopedia dump: a JSON array of free-form records
pub fn load_wiki_records(path: &Path) -> Result<Vec<RawEntityRecord>> {
    let file = File::open(path)?;
    let records = wiki_records_from_reader(BufReader::new(file))?;
    info!(path = %path.display(), count = records.len(), "loaded encyclopedia records");
    Ok(records)
}

pub fn wiki_records_from_reader<R: Read>(reader: R) -> Result<Vec<RawEntityRecord>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load the metadata CSV with every column kept as text
pub fn load_metadata_rows(path: &Path) -> Result<Vec<RawMetadataRow>> {
    let file = File::open(path)?;
    let rows = metadata_rows_from_reader(file)?;
    info!(path = %path.display(), count = rows.len(), "loaded metadata rows");
    Ok(rows)
}

pub fn metadata_rows_from_reader<R: Read>(reader: R) -> Result<Vec<RawMetadataRow>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// A bounded slice of the ratings log
#[derive(Debug, Clone)]
pub struct RatingsChunk {
    /// Index of the first row within the whole log
    pub offset: usize,
    pub rows: Vec<RawRatingRow>,
}

/// Sequential fixed-size chunks over a ratings CSV; only one chunk is
/// resident at a time.
pub struct RatingsChunks<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, RawRatingRow>,
    chunk_size: usize,
    rows_read: usize,
}

impl RatingsChunks<File> {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        debug!(path = %path.display(), chunk_size, "streaming ratings");
        Ok(Self::from_reader(file, chunk_size))
    }
}

impl<R: Read> RatingsChunks<R> {
    pub fn from_reader(reader: R, chunk_size: usize) -> Self {
        Self {
            records: csv::Reader::from_reader(reader).into_deserialize(),
            chunk_size: chunk_size.max(1),
            rows_read: 0,
        }
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}

impl<R: Read> Iterator for RatingsChunks<R> {
    type Item = Result<RatingsChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.rows_read;
        let mut rows = Vec::with_capacity(self.chunk_size.min(64 * 1024));

        while rows.len() < self.chunk_size {
            match self.records.next() {
                Some(Ok(row)) => rows.push(row),
                Some(Err(e)) => return Some(Err(e.into())),
                None => break,
            }
        }

        if rows.is_empty() {
            return None;
        }
        self.rows_read += rows.len();
        Some(Ok(RatingsChunk { offset, rows }))
    }
}
