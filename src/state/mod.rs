//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the crawl state machine (init, fetching, ..., done/cancelled/failed)
//! - `CrawlState`: cursor and counters owned by the coordinator for one crawl
//! - `CancelFlag`: shared stop request checked between pages

mod crawl_phase;
mod crawl_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use crawl_state::{CancelFlag, CrawlState};
