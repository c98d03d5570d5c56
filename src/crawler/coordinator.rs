//! Crawl coordinator - the pagination state machine
//!
//! This module drives one crawl from the first page to a terminal phase:
//! - Validating the request before any network traffic
//! - Looking up the app's store details and clearing stale chunks
//! - Fetching, decoding and filtering one page per iteration
//! - Deciding when pagination is over
//! - Flushing buffered reviews on every way out, including failure
//! - Observing cancellation between pages

use crate::config::validation::{validate_chunk_size, validate_page_size};
use crate::config::Config;
use crate::crawler::filter::{FilterDecision, ReviewFilter};
use crate::crawler::parser::{parse_app_details, parse_page};
use crate::crawler::{Fetcher, RetryPolicy};
use crate::output::{ChunkStore, ChunkWriter, CrawlReport, CrawlStatus, DirectoryStore, StopReason};
use crate::review::{CrawlRequest, Cursor};
use crate::state::{CancelFlag, CrawlPhase, CrawlState};
use crate::{ConfigError, CrawlError, ParseError};
use std::time::Instant;

/// What one page contributed to the termination decision
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageOutcome {
    entries: usize,
    next_cursor: Cursor,
    out_of_range: bool,
}

/// Main crawl coordinator structure
pub struct Coordinator<S = DirectoryStore> {
    config: Config,
    request: CrawlRequest,
    fetcher: Fetcher,
    filter: ReviewFilter,
    writer: ChunkWriter<S>,
    state: CrawlState,
    cancel: CancelFlag,
}

impl Coordinator<DirectoryStore> {
    /// Creates a coordinator that writes chunks into `config.output.directory`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - The HTTP client could not be built
    pub fn new(config: Config, request: CrawlRequest) -> Result<Self, CrawlError> {
        let store = DirectoryStore::new(&config.output.directory);
        Self::with_store(config, request, store)
    }
}

impl<S: ChunkStore> Coordinator<S> {
    /// Creates a coordinator that hands finished chunks to `store`
    pub fn with_store(config: Config, request: CrawlRequest, store: S) -> Result<Self, CrawlError> {
        let retry = RetryPolicy::from_config(&config.retry);
        let fetcher = Fetcher::new(config.api.clone(), retry)?;
        let filter = ReviewFilter::new(request.app_id, request.date_range)
            .anonymize_reviewers(config.crawl.anonymize_reviewers);
        let writer = ChunkWriter::new(store, request.app_id, config.output.chunk_size);

        Ok(Self {
            config,
            request,
            fetcher,
            filter,
            writer,
            state: CrawlState::default(),
            cancel: CancelFlag::new(),
        })
    }

    /// Replaces the cancellation flag, e.g. with one shared with a signal handler
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops the crawl before its next page when cancelled
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn request(&self) -> &CrawlRequest {
        &self.request
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the crawl to a terminal phase
    ///
    /// Never returns early with an error: failures are carried in the
    /// report's status, after buffered reviews have been flushed where
    /// possible.
    pub async fn run(mut self) -> CrawlReport {
        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl of app {} for {} (max pages: {})",
            self.request.app_id,
            self.request.date_range,
            self.request.max_pages
        );

        let (status, stop_reason) = match self.crawl().await {
            Ok(StopReason::Cancelled) => (CrawlStatus::Cancelled, Some(StopReason::Cancelled)),
            Ok(reason) => (CrawlStatus::Done, Some(reason)),
            Err(err) => {
                self.fail(&err);
                (CrawlStatus::Failed(err), None)
            }
        };

        let elapsed = start_time.elapsed();
        tracing::info!(
            "Crawl {}: {} pages, {} reviews accepted in {:?}",
            status.as_str(),
            self.state.pages_fetched(),
            self.state.reviews_accepted(),
            elapsed
        );

        CrawlReport {
            app_id: self.request.app_id,
            status,
            stop_reason,
            files: self.writer.written_files().to_vec(),
            next_chunk_index: self.writer.next_index(),
            unflushed: self.writer.buffered(),
            app_details: self.filter.app_details().cloned(),
            state: self.state,
            elapsed,
        }
    }

    /// The happy path: validate, paginate, flush
    async fn crawl(&mut self) -> Result<StopReason, CrawlError> {
        self.validate_request()?;
        if self.config.api.app_details {
            self.lookup_app_details().await?;
        }

        let stale = self.writer.clear_stale()?;
        if !stale.is_empty() {
            tracing::info!("Removed {} chunk files from an earlier run", stale.len());
        }

        let reason = loop {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    "Cancellation requested after {} pages",
                    self.state.pages_fetched()
                );
                break StopReason::Cancelled;
            }

            if let Some(reason) = self.step().await? {
                tracing::info!("Pagination finished: {}", reason);
                break reason;
            }
        };

        self.state.transition(CrawlPhase::Flushing);
        self.writer.flush(true)?;

        let terminal = match reason {
            StopReason::Cancelled => CrawlPhase::Cancelled,
            _ => CrawlPhase::Done,
        };
        self.state.transition(terminal);
        Ok(reason)
    }

    fn validate_request(&self) -> Result<(), CrawlError> {
        validate_page_size(self.config.crawl.page_size).map_err(invalid_input)?;
        validate_chunk_size(self.config.output.chunk_size).map_err(invalid_input)?;

        let range = self.request.date_range;
        if let (Some(lower), Some(upper)) = (range.lower(), range.upper()) {
            if lower > upper {
                return Err(CrawlError::InvalidInput(format!(
                    "date range {} is empty",
                    range
                )));
            }
        }
        Ok(())
    }

    /// Fetches the app's name and developers so every review carries them
    async fn lookup_app_details(&mut self) -> Result<(), CrawlError> {
        let app_id = self.request.app_id;
        let body = self.fetcher.fetch_app_details(app_id).await?;
        let details = parse_app_details(&body, app_id).map_err(|err| match err {
            ParseError::ApiRejected { .. } => {
                CrawlError::InvalidInput(format!("app {} is not listed in the store", app_id))
            }
            other => CrawlError::Parse(other),
        })?;

        tracing::info!(
            "App {}: {} ({}) by {}",
            app_id,
            details.name,
            details.kind.as_deref().unwrap_or("unknown type"),
            details.developer_label()
        );
        self.filter.set_app_details(details);
        Ok(())
    }

    /// Processes one page and returns the reason to stop, if any
    async fn step(&mut self) -> Result<Option<StopReason>, CrawlError> {
        let used = self.state.cursor().clone();

        self.state.transition(CrawlPhase::Fetching);
        let body = self
            .fetcher
            .fetch(self.request.app_id, &used, self.config.crawl.page_size)
            .await?;

        self.state.transition(CrawlPhase::Parsing);
        let page = parse_page(&body)?;
        if self.state.pages_fetched() == 0 {
            if let Some(total) = page.summary.total_reviews {
                tracing::info!("API reports {} reviews in total", total);
            }
        }

        self.state.transition(CrawlPhase::Filtering);
        let mut out_of_range = false;
        for entry in &page.reviews {
            match self.filter.accept(entry) {
                Ok(FilterDecision::Included(review)) => {
                    self.state.record_accepted();
                    self.writer.append(review)?;
                }
                Ok(FilterDecision::Excluded) => self.state.record_rejected(),
                Ok(FilterDecision::OutOfRangeHint) => {
                    self.state.record_out_of_range();
                    out_of_range = true;
                }
                Err(anomaly) => {
                    tracing::warn!("{}", anomaly);
                    self.state.record_anomaly();
                }
            }
        }

        self.state.record_page();
        self.state.transition(CrawlPhase::CheckingTermination);
        tracing::info!(
            "Page {}: {} entries ({} accepted, {} rejected, {} skipped so far)",
            self.state.pages_fetched(),
            page.reviews.len(),
            self.state.reviews_accepted(),
            self.state.reviews_rejected(),
            self.state.anomalies()
        );

        let outcome = PageOutcome {
            entries: page.reviews.len(),
            next_cursor: page.cursor,
            out_of_range,
        };
        let reason = self.termination(&used, &outcome);
        if reason.is_none() {
            self.state.advance_cursor(outcome.next_cursor);
        }
        Ok(reason)
    }

    /// Termination rules, checked in order after every page
    fn termination(&self, used: &Cursor, outcome: &PageOutcome) -> Option<StopReason> {
        if outcome.entries == 0 {
            Some(StopReason::EmptyPage)
        } else if outcome.next_cursor == *used {
            Some(StopReason::CursorRepeated)
        } else if outcome.next_cursor.is_exhausted() {
            Some(StopReason::CursorExhausted)
        } else if self.request.page_limit_reached(self.state.pages_fetched()) {
            Some(StopReason::PageLimit)
        } else if outcome.out_of_range && self.config.crawl.early_stop {
            Some(StopReason::OutOfRange)
        } else {
            None
        }
    }

    /// Moves to `Failed` and makes a last attempt to write buffered reviews
    fn fail(&mut self, err: &CrawlError) {
        tracing::error!(
            "Crawl failed during {} ({}): {}",
            self.state.phase(),
            err.kind(),
            err
        );
        self.state.transition(CrawlPhase::Failed);

        let buffered = self.writer.buffered();
        match self.writer.flush(true) {
            Ok(Some(path)) => tracing::info!(
                "Saved {} buffered reviews to {} before stopping",
                buffered,
                path.display()
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!("{} buffered reviews could not be saved: {}", buffered, e),
        }
    }
}

fn invalid_input(err: ConfigError) -> CrawlError {
    match err {
        ConfigError::Validation(message) => CrawlError::InvalidInput(message),
        other => CrawlError::Config(other),
    }
}
