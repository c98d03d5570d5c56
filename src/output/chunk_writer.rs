//! Buffered, size-bounded chunk output
//!
//! Accepted reviews accumulate in memory until `chunk_size` of them are
//! buffered, at which point they are handed to the store as one chunk. A
//! forced flush at the end of a crawl writes the remainder.

use crate::output::traits::{ChunkStore, WriteResult};
use crate::review::{AppId, Review};
use std::path::PathBuf;

/// Buffers reviews and emits them as fixed-size chunks
pub struct ChunkWriter<S> {
    store: S,
    app_id: AppId,
    chunk_size: usize,
    buffer: Vec<Review>,
    next_index: u32,
    written: Vec<PathBuf>,
}

impl<S: ChunkStore> ChunkWriter<S> {
    /// Creates a writer whose first chunk gets index 1
    pub fn new(store: S, app_id: AppId, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            store,
            app_id,
            chunk_size,
            buffer: Vec::with_capacity(chunk_size.min(10_000)),
            next_index: 1,
            written: Vec::new(),
        }
    }

    /// Buffers one review, writing a chunk if the buffer is now full
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - The buffer filled up and was written to `path`
    /// * `Ok(None)` - The review was buffered
    /// * `Err(WriteError)` - The full buffer could not be written; it is kept
    pub fn append(&mut self, review: Review) -> WriteResult<Option<PathBuf>> {
        self.buffer.push(review);
        if self.buffer.len() >= self.chunk_size {
            self.flush(false)
        } else {
            Ok(None)
        }
    }

    /// Writes the buffer as one chunk
    ///
    /// Without `forced`, nothing happens until the buffer holds a full chunk.
    /// With `forced`, any non-empty remainder is written. An empty buffer
    /// never produces a file. On error the buffer and index are unchanged.
    pub fn flush(&mut self, forced: bool) -> WriteResult<Option<PathBuf>> {
        if self.buffer.is_empty() || (!forced && self.buffer.len() < self.chunk_size) {
            return Ok(None);
        }

        let path = self
            .store
            .write_chunk(self.app_id, self.next_index, &self.buffer)?;

        tracing::info!(
            "Saved chunk {} ({} reviews) to {}",
            self.next_index,
            self.buffer.len(),
            path.display()
        );

        self.next_index += 1;
        self.buffer.clear();
        self.written.push(path.clone());
        Ok(Some(path))
    }

    /// Removes this app's chunks from an earlier run
    ///
    /// Only meaningful before the first chunk is written; afterwards it
    /// would delete this run's own output, so it does nothing.
    pub fn clear_stale(&mut self) -> WriteResult<Vec<PathBuf>> {
        if !self.written.is_empty() {
            return Ok(Vec::new());
        }
        self.store.clear_stale(self.app_id)
    }

    /// Reviews accepted but not yet written
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Index the next chunk will be written under
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Files written so far, in index order
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
