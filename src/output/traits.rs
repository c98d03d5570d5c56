//! Chunk store trait and error types
//!
//! A chunk store persists one finished chunk of reviews. The chunk writer
//! decides when a chunk is finished; the store decides where it goes.

use crate::review::{AppId, Review};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting a chunk
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to serialize chunk {index}: {source}")]
    Serialize {
        index: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for chunk persistence
pub type WriteResult<T> = Result<T, WriteError>;

/// File name of chunk `index` for `app_id`
///
/// Deterministic so that re-running a crawl overwrites the same files.
pub fn chunk_file_name(app_id: AppId, index: u32) -> String {
    format!("reviews_{}_{}.json", app_id, index)
}

/// True if `name` is a chunk file (or its temporary file) of `app_id`
pub fn is_chunk_file_of(name: &str, app_id: AppId) -> bool {
    let prefix = format!("reviews_{}_", app_id);
    let index = match name.strip_prefix(prefix.as_str()) {
        Some(rest) => rest
            .strip_suffix(".json")
            .or_else(|| rest.strip_suffix(".json.tmp")),
        None => None,
    };
    matches!(index, Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Trait for chunk persistence backends
///
/// Implementations must be all-or-nothing: after an error no file (or a
/// previously complete file) exists under the chunk's name.
pub trait ChunkStore {
    /// Persists one chunk of reviews as a JSON array
    ///
    /// # Arguments
    ///
    /// * `app_id` - The application the reviews belong to
    /// * `index` - 1-based sequence number of the chunk
    /// * `reviews` - The chunk's reviews in acceptance order
    ///
    /// # Returns
    ///
    /// The location the chunk was written to
    fn write_chunk(&mut self, app_id: AppId, index: u32, reviews: &[Review])
        -> WriteResult<PathBuf>;

    /// Removes chunks of `app_id` left over from an earlier run
    ///
    /// Called once before the first chunk of a crawl is written. Stores
    /// without persistent state have nothing to clear.
    fn clear_stale(&mut self, _app_id: AppId) -> WriteResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

impl<S: ChunkStore + ?Sized> ChunkStore for Box<S> {
    fn write_chunk(
        &mut self,
        app_id: AppId,
        index: u32,
        reviews: &[Review],
    ) -> WriteResult<PathBuf> {
        (**self).write_chunk(app_id, index, reviews)
    }

    fn clear_stale(&mut self, app_id: AppId) -> WriteResult<Vec<PathBuf>> {
        (**self).clear_stale(app_id)
    }
}
