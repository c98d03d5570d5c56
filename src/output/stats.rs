//! Crawl outcome reporting
//!
//! This module defines the value a finished crawl hands back to its caller
//! and a plain-text printer for it.

use crate::review::{AppDetails, AppId};
use crate::state::CrawlState;
use crate::CrawlError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The last page contained no reviews
    EmptyPage,

    /// The API echoed back the cursor it was given
    CursorRepeated,

    /// The API did not hand out a next cursor
    CursorExhausted,

    /// The configured page budget was used up
    PageLimit,

    /// Reviews older than the date range were seen and early-stop is on
    OutOfRange,

    /// A stop was requested from outside
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyPage => "empty_page",
            Self::CursorRepeated => "cursor_repeated",
            Self::CursorExhausted => "cursor_exhausted",
            Self::PageLimit => "page_limit",
            Self::OutOfRange => "out_of_range",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of a crawl
#[derive(Debug)]
pub enum CrawlStatus {
    /// Pagination ended and every accepted review was written
    Done,

    /// Stopped on request after writing buffered reviews
    Cancelled,

    /// Stopped on a fatal error
    Failed(CrawlError),
}

impl CrawlStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The error that ended the crawl, if it failed
    pub fn error(&self) -> Option<&CrawlError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "failed ({}): {}", err.kind(), err),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Everything a caller learns about a finished crawl
#[derive(Debug)]
pub struct CrawlReport {
    pub app_id: AppId,
    pub status: CrawlStatus,

    /// Set when pagination ended normally or by cancellation
    pub stop_reason: Option<StopReason>,

    /// Final snapshot of the crawl state
    pub state: CrawlState,

    /// Chunk files written, in index order
    pub files: Vec<PathBuf>,

    /// Index the next chunk would have been written under
    pub next_chunk_index: u32,

    /// Accepted reviews that could not be written
    pub unflushed: usize,

    /// Store details, when the lookup was enabled and succeeded
    pub app_details: Option<AppDetails>,

    pub elapsed: Duration,
}

impl CrawlReport {
    /// Reviews that made it into a chunk file
    pub fn reviews_written(&self) -> u64 {
        self.state.reviews_accepted() - self.unflushed as u64
    }
}

/// Prints a crawl report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("App ID: {}", report.app_id);
    if let Some(details) = &report.app_details {
        println!("App: {} by {}", details.name, details.developer_label());
    }
    println!("Status: {}", report.status);
    if let Some(reason) = report.stop_reason {
        println!("Stopped because: {}", reason);
    }
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    println!("Pages:");
    println!("  Fetched: {}", report.state.pages_fetched());
    println!("  Last cursor: {}", report.state.cursor());
    println!();

    println!("Reviews:");
    println!("  Accepted: {}", report.state.reviews_accepted());
    println!("  Outside date range: {}", report.state.reviews_rejected());
    println!("  Skipped (undecodable): {}", report.state.anomalies());
    if report.unflushed > 0 {
        println!("  Not written: {}", report.unflushed);
    }
    println!();

    println!("Output Files ({}):", report.files.len());
    for file in &report.files {
        println!("  - {}", file.display());
    }
}
