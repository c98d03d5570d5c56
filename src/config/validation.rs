use crate::config::types::{ApiConfig, Config, CrawlConfig, OutputConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// Largest page the review API will serve
pub const MAX_PAGE_SIZE: u32 = 100;

/// Accepted values for the API's `filter` parameter
const REVIEW_FILTERS: &[&str] = &["recent", "updated", "all"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_retry_config(&config.retry)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the endpoint and fixed query parameters
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got timeout={}s connect={}s",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    if !REVIEW_FILTERS.contains(&config.review_filter.as_str()) {
        return Err(ConfigError::Validation(format!(
            "review_filter must be one of {:?}, got '{}'",
            REVIEW_FILTERS, config.review_filter
        )));
    }

    if config.language.is_empty() || config.purchase_type.is_empty() {
        return Err(ConfigError::Validation(
            "language and purchase_type cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry limits
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.base_delay_ms < 1 {
        return Err(ConfigError::Validation(
            "base_delay_ms must be >= 1".to_string(),
        ));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates pagination settings
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_page_size(config.page_size)
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    validate_chunk_size(config.chunk_size)
}

/// Checks that a page size is within what the API serves
pub fn validate_page_size(page_size: u32) -> Result<(), ConfigError> {
    if page_size < 1 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

/// Checks that a chunk can hold at least one review
pub fn validate_chunk_size(chunk_size: usize) -> Result<(), ConfigError> {
    if chunk_size < 1 {
        return Err(ConfigError::Validation(
            "chunk_size must be >= 1".to_string(),
        ));
    }
    Ok(())
}
