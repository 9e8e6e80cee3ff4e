use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::Storage;
use crate::domain::{RatedMovie, RatingEvent, RatedMovieTable};
use crate::error::Result;

/// In-memory storage implementation for development/testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    movie_header: Arc<Mutex<Vec<String>>>,
    movies: Arc<Mutex<Vec<RatedMovie>>>,
    ratings: Arc<Mutex<Vec<RatingEvent>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movie_header(&self) -> Vec<String> {
        lock(&self.movie_header).clone()
    }

    pub fn movies(&self) -> Vec<RatedMovie> {
        lock(&self.movies).clone()
    }

    pub fn ratings(&self) -> Vec<RatingEvent> {
        lock(&self.ratings).clone()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn append_movies(&self, table: &RatedMovieTable) -> Result<usize> {
        let mut header = lock(&self.movie_header);
        if header.is_empty() {
            *header = table.header();
        }
        lock(&self.movies).extend(table.rows.iter().cloned());

        debug!("Appended {} movies", table.len());
        Ok(table.len())
    }

    async fn append_ratings(&self, events: &[RatingEvent]) -> Result<usize> {
        lock(&self.ratings).extend_from_slice(events);
        debug!("Appended {} ratings", events.len());
        Ok(events.len())
    }
}
