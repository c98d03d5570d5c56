//! Output module for persisting accepted reviews
//!
//! This module handles:
//! - Buffering accepted reviews into fixed-size chunks
//! - Writing each chunk atomically as a JSON array file
//! - Reporting the outcome of a crawl

mod chunk_writer;
mod directory;
pub mod stats;
mod traits;

pub use chunk_writer::ChunkWriter;
pub use directory::DirectoryStore;
pub use stats::{print_report, CrawlReport, CrawlStatus, StopReason};
pub use traits::{chunk_file_name, is_chunk_file_of, ChunkStore, WriteError, WriteResult};
