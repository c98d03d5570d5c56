//! Page decoder for review API responses
//!
//! This module turns one raw response body into a `PageResult`:
//! - the `success` flag is checked before anything else is trusted
//! - the `reviews` array is kept as raw entries for the filter to decode
//! - the `cursor` becomes the next pagination token (empty when absent)
//! - the `query_summary` is decoded leniently and only used for logging
//!
//! It also decodes the store's app-details response into `AppDetails`.

use crate::review::{AppDetails, AppId, Cursor};
use crate::ParseError;
use serde::Deserialize;
use serde_json::Value;

/// One decoded page
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Raw review entries in the order the API returned them
    pub reviews: Vec<Value>,

    /// Token for the next page; empty when the API omitted it
    pub cursor: Cursor,

    /// Informational totals reported alongside the page
    pub summary: QuerySummary,
}

/// Totals the API reports with each page
///
/// Every field is optional; the API only fills most of them on the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuerySummary {
    pub num_reviews: Option<u64>,
    pub review_score: Option<u32>,
    pub review_score_desc: Option<String>,
    pub total_positive: Option<u64>,
    pub total_negative: Option<u64>,
    pub total_reviews: Option<u64>,
}

/// Page fields decoded once `success` has been checked
#[derive(Debug, Deserialize)]
struct RawPage {
    cursor: Option<String>,
    query_summary: Option<Value>,
    reviews: Option<Vec<Value>>,
}

/// Parses a raw page body
///
/// # Returns
///
/// * `Ok(PageResult)` - The page was accepted by the API and well formed
/// * `Err(ParseError::ApiRejected)` - `success` is missing or not 1/true
/// * `Err(ParseError::Malformed)` - Invalid JSON or a missing/mistyped field
///
/// # Example
///
/// ```
/// use review_crawler::crawler::parse_page;
///
/// let page = parse_page(r#"{"success":1,"cursor":"AoJ4","reviews":[]}"#).unwrap();
/// assert_eq!(page.cursor.as_str(), "AoJ4");
/// assert!(page.reviews.is_empty());
/// ```
pub fn parse_page(body: &str) -> Result<PageResult, ParseError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ParseError::Malformed(format!("invalid page JSON: {}", e)))?;
    if !value.is_object() {
        return Err(ParseError::Malformed("page is not a JSON object".to_string()));
    }
    check_success(value.get("success"))?;

    let raw = RawPage::deserialize(value)
        .map_err(|e| ParseError::Malformed(format!("invalid page: {}", e)))?;

    let reviews = raw
        .reviews
        .ok_or_else(|| ParseError::Malformed("missing 'reviews' array".to_string()))?;

    let summary = raw
        .query_summary
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    Ok(PageResult {
        reviews,
        cursor: Cursor::new(raw.cursor.unwrap_or_default()),
        summary,
    })
}

/// Store metadata fields used for labelling reviews
#[derive(Debug, Deserialize)]
struct RawAppData {
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    developers: Vec<String>,
}

/// Parses an app-details body, which is keyed by the requested app id
///
/// # Returns
///
/// * `Ok(AppDetails)` - The store knows the app
/// * `Err(ParseError::ApiRejected)` - The store has no such app
/// * `Err(ParseError::Malformed)` - Invalid JSON or no usable entry for the app
pub fn parse_app_details(body: &str, app_id: AppId) -> Result<AppDetails, ParseError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ParseError::Malformed(format!("invalid app details JSON: {}", e)))?;
    let key = app_id.to_string();
    let entry = value
        .get(key.as_str())
        .ok_or_else(|| ParseError::Malformed(format!("no app details entry for {}", app_id)))?;

    check_success(entry.get("success"))?;

    let data = entry
        .get("data")
        .ok_or_else(|| ParseError::Malformed(format!("app details for {} carry no data", app_id)))?;
    let raw = RawAppData::deserialize(data)
        .map_err(|e| ParseError::Malformed(format!("invalid app details: {}", e)))?;

    Ok(AppDetails {
        name: raw.name,
        kind: raw.kind,
        developers: raw.developers,
    })
}

fn check_success(flag: Option<&Value>) -> Result<(), ParseError> {
    match flag {
        Some(flag) if is_success(flag) => Ok(()),
        Some(flag) => Err(ParseError::ApiRejected {
            success: flag.to_string(),
        }),
        None => Err(ParseError::ApiRejected {
            success: "missing".to_string(),
        }),
    }
}

fn is_success(flag: &Value) -> bool {
    match flag {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}
