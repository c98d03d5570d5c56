//! Identifiers and invocation parameters for a crawl

use crate::review::DateRange;
use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the application whose reviews are crawled
///
/// Always positive; a zero id is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(u32);

impl AppId {
    /// Creates an app id, rejecting zero
    pub fn new(id: u32) -> Result<Self, CrawlError> {
        if id == 0 {
            return Err(CrawlError::InvalidInput(
                "app id must be a positive integer".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppId {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().parse::<u32>().map_err(|e| {
            CrawlError::InvalidInput(format!("app id '{}' is not a whole number: {}", s, e))
        })?;
        Self::new(id)
    }
}

/// Store metadata of the crawled application
///
/// Looked up once per crawl and copied onto every review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    pub name: String,

    /// Store category, e.g. `game` or `dlc`
    pub kind: Option<String>,

    pub developers: Vec<String>,
}

impl AppDetails {
    /// Developers joined for display, or `Unknown` when the store lists none
    pub fn developer_label(&self) -> String {
        if self.developers.is_empty() {
            "Unknown".to_string()
        } else {
            self.developers.join(", ")
        }
    }
}

/// Opaque pagination token handed out by the review API
///
/// `"*"` requests the first page. The API signals exhaustion by echoing the
/// previous cursor back, or by omitting it (stored here as the empty string).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Token that requests the first page
    pub const INITIAL: &'static str = "*";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn initial() -> Self {
        Self::new(Self::INITIAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_initial(&self) -> bool {
        self.0 == Self::INITIAL
    }

    /// True when the API did not hand out a follow-up token
    pub fn is_exhausted(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of one crawl, fixed for its whole lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub app_id: AppId,
    pub date_range: DateRange,
    /// Maximum pages to fetch; 0 means unlimited
    pub max_pages: u32,
}

impl CrawlRequest {
    pub fn new(app_id: AppId, date_range: DateRange) -> Self {
        Self {
            app_id,
            date_range,
            max_pages: 0,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Returns true once `pages_fetched` has used up the page budget
    pub fn page_limit_reached(&self, pages_fetched: u32) -> bool {
        self.max_pages > 0 && pages_fetched >= self.max_pages
    }
}
