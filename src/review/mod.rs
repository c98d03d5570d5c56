//! Review domain types
//!
//! - `AppId`, `Cursor`: identifiers exchanged with the review API
//! - `AppDetails`: store metadata used to label reviews
//! - `DateRange`: the inclusive submission-time window a crawl selects
//! - `Review`: the canonical record persisted to output chunks
//! - `CrawlRequest`: the per-crawl invocation parameters

mod date_range;
mod entity;
mod types;

pub use date_range::DateRange;
pub use entity::{anonymize_reviewer, content_id, Review};
pub use types::{AppDetails, AppId, CrawlRequest, Cursor};
