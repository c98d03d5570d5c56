//! Review-Crawler: a cursor-paginated review harvester
//!
//! This crate pages through the public review feed of a single application,
//! keeps the reviews that fall inside a date range, and persists them as
//! bounded-size JSON chunk files.

pub mod config;
pub mod crawler;
pub mod output;
pub mod review;
pub mod state;

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Write error: {0}")]
    Write(#[from] output::WriteError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl CrawlError {
    /// Returns the coarse kind of this error, used for exit-status reporting
    pub fn kind(&self) -> CrawlErrorKind {
        match self {
            Self::Config(_) => CrawlErrorKind::Config,
            Self::InvalidInput(_) => CrawlErrorKind::InvalidInput,
            Self::Fetch(FetchError::Exhausted { .. }) => CrawlErrorKind::FetchExhausted,
            Self::Fetch(FetchError::Transient { .. }) => CrawlErrorKind::FetchExhausted,
            Self::Fetch(FetchError::Fatal { .. }) => CrawlErrorKind::FetchFatal,
            Self::Parse(ParseError::ApiRejected { .. }) => CrawlErrorKind::ApiRejected,
            Self::Parse(ParseError::Malformed(_)) => CrawlErrorKind::Malformed,
            Self::Write(_) => CrawlErrorKind::Write,
            Self::Reqwest(_) => CrawlErrorKind::Client,
        }
    }
}

/// Coarse classification of a fatal crawl error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlErrorKind {
    Config,
    InvalidInput,
    FetchExhausted,
    FetchFatal,
    ApiRejected,
    Malformed,
    Write,
    Client,
}

impl CrawlErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::InvalidInput => "invalid_input",
            Self::FetchExhausted => "fetch_exhausted",
            Self::FetchFatal => "fetch_fatal",
            Self::ApiRejected => "api_rejected",
            Self::Malformed => "malformed",
            Self::Write => "write",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for CrawlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while fetching a page from the review API
///
/// `Transient` never escapes the fetcher: it is retried until the attempt
/// budget runs out, at which point it becomes `Exhausted`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transient failure: {reason}")]
    Transient {
        reason: String,
        retry_after: Option<Duration>,
    },

    #[error("Gave up after {attempts} attempts, last failure: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("Request failed permanently: {message}")]
    Fatal { status: Option<u16>, message: String },
}

/// Errors raised while decoding a page body
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("API rejected the request (success = {success})")]
    ApiRejected { success: String },

    #[error("Malformed page: {0}")]
    Malformed(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use output::{CrawlReport, CrawlStatus, StopReason};
pub use review::{AppDetails, AppId, CrawlRequest, Cursor, DateRange, Review};
pub use state::{CancelFlag, CrawlPhase, CrawlState};
