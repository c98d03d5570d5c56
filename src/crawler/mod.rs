//! Crawler module for review page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Page decoding and per-entry review filtering
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod filter;
mod parser;
mod retry;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, classify_status, Fetcher, StatusClass};
pub use filter::{FilterAnomaly, FilterDecision, ReviewFilter};
pub use parser::{parse_app_details, parse_page, PageResult, QuerySummary};
pub use retry::{Backoff, RetryPolicy};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::review::CrawlRequest;
use crate::state::CancelFlag;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and look up the app details
/// 2. Page through the review feed until a stop condition
/// 3. Write accepted reviews as chunk files
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - Which app and date range to crawl
/// * `cancel` - Observed between pages; cancel it to stop early
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl reached a terminal phase (check its status)
/// * `Err(CrawlError)` - The crawl could not be started
pub async fn crawl(
    config: Config,
    request: CrawlRequest,
    cancel: &CancelFlag,
) -> Result<CrawlReport, CrawlError> {
    let report = Coordinator::new(config, request)?
        .with_cancel(cancel.clone())
        .run()
        .await;
    Ok(report)
}
