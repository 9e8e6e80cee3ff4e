// Persistence port: append-only hand-off of the final tables

pub mod csv_file;
pub mod in_memory;

use async_trait::async_trait;

use crate::domain::{RatedMovieTable, RatingEvent};
use crate::error::Result;

pub use csv_file::CsvFileStorage;
pub use in_memory::InMemoryStorage;

/// Storage trait for the terminal persistence step; rows are only ever appended
#[async_trait]
pub trait Storage: Send + Sync {
    /// Append the reconciled movie table, returning the number of rows written
    async fn append_movies(&self, table: &RatedMovieTable) -> Result<usize>;

    /// Append one chunk of rating events, returning the number of rows written
    async fn append_ratings(&self, events: &[RatingEvent]) -> Result<usize>;
}
