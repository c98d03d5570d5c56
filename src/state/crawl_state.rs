use crate::review::Cursor;
use crate::state::CrawlPhase;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress of a single crawl
///
/// Owned by the coordinator for the lifetime of one crawl and mutated once
/// per page. Cloning yields a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    /// Current state machine phase
    phase: CrawlPhase,

    /// Cursor to send with the next request
    cursor: Cursor,

    /// Pages successfully fetched and parsed
    pages_fetched: u32,

    /// Reviews handed to the chunk writer
    reviews_accepted: u64,

    /// Reviews outside the date range
    reviews_rejected: u64,

    /// Entries skipped because they could not be decoded
    anomalies: u64,

    /// Whether any entry so far was older than the range's lower bound
    out_of_range_seen: bool,
}

impl CrawlState {
    /// Creates the state for a crawl starting at `cursor`
    pub fn new(cursor: Cursor) -> Self {
        Self {
            phase: CrawlPhase::Init,
            cursor,
            pages_fetched: 0,
            reviews_accepted: 0,
            reviews_rejected: 0,
            anomalies: 0,
            out_of_range_seen: false,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn reviews_accepted(&self) -> u64 {
        self.reviews_accepted
    }

    pub fn reviews_rejected(&self) -> u64 {
        self.reviews_rejected
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn out_of_range_seen(&self) -> bool {
        self.out_of_range_seen
    }

    /// Moves the state machine to `next`
    ///
    /// Transitions that `CrawlPhase::can_transition_to` forbids indicate a
    /// coordinator bug; they are logged and rejected.
    pub fn transition(&mut self, next: CrawlPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            tracing::warn!("Ignoring invalid phase transition {} -> {}", self.phase, next);
            debug_assert!(false, "invalid phase transition {} -> {}", self.phase, next);
            return false;
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        true
    }

    /// Records a fetched and decoded page
    pub fn record_page(&mut self) {
        self.pages_fetched += 1;
    }

    pub fn record_accepted(&mut self) {
        self.reviews_accepted += 1;
    }

    pub fn record_rejected(&mut self) {
        self.reviews_rejected += 1;
    }

    /// Records a rejected review that was older than the range
    pub fn record_out_of_range(&mut self) {
        self.reviews_rejected += 1;
        self.out_of_range_seen = true;
    }

    pub fn record_anomaly(&mut self) {
        self.anomalies += 1;
    }

    /// Replaces the cursor used for the next request
    pub fn advance_cursor(&mut self, next: Cursor) {
        self.cursor = next;
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new(Cursor::initial())
    }
}

/// Shared stop request for a running crawl
///
/// Clones observe the same flag. The coordinator checks it between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the crawl stop before its next page
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
