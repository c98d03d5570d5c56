use serde::Deserialize;

/// Main configuration structure for the review crawler
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// Review API endpoint and fixed query parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the store; requests go to `{endpoint}/appreviews/{appid}`
    pub endpoint: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Value of the `filter` query parameter (`recent`, `updated` or `all`)
    #[serde(rename = "review-filter")]
    pub review_filter: String,

    /// Value of the `language` query parameter
    pub language: String,

    /// Value of the `purchase_type` query parameter
    #[serde(rename = "purchase-type")]
    pub purchase_type: String,

    /// Value of the `day_range` query parameter, omitted when unset
    #[serde(rename = "day-range")]
    pub day_range: Option<u32>,

    /// Look up the app's name and developers before crawling
    #[serde(rename = "app-details")]
    pub app_details: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://store.steampowered.com".to_string(),
            user_agent: format!("review-crawler/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            review_filter: "recent".to_string(),
            language: "all".to_string(),
            purchase_type: "all".to_string(),
            day_range: None,
            app_details: true,
        }
    }
}

/// Retry/backoff limits for transient API failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per page, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds); doubles on each retry
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 32_000,
        }
    }
}

/// Pagination and filtering behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Reviews requested per page (the API caps this at 100)
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Maximum pages to fetch; 0 means unlimited
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Stop paginating once a page contains reviews older than the range
    #[serde(rename = "early-stop")]
    pub early_stop: bool,

    /// Replace reviewer ids with their SHA-256 digest in the output
    #[serde(rename = "anonymize-reviewers")]
    pub anonymize_reviewers: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 0,
            early_stop: true,
            anonymize_reviewers: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the chunk files are written into
    pub directory: String,

    /// Maximum number of reviews per chunk file
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "reviews".to_string(),
            chunk_size: 5_000,
        }
    }
}
