//! Review filter: raw entry to `Review`, plus the date-range decision
//!
//! Decoding happens per entry. A broken entry is reported as a
//! `FilterAnomaly` and skipped by the caller; it never fails the page.

use crate::review::{anonymize_reviewer, content_id, AppDetails, AppId, DateRange, Review};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Outcome of filtering one decoded entry
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    /// Inside the date range
    Included(Review),

    /// Newer than the range's upper bound
    Excluded,

    /// Older than the range's lower bound
    ///
    /// With the API's recency ordering, later pages will be older still.
    OutOfRangeHint,
}

/// An entry that could not be turned into a `Review`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAnomaly {
    /// The entry's recommendation id, when it had a readable one
    pub recommendation_id: Option<String>,

    /// What was wrong with the entry
    pub reason: String,
}

impl fmt::Display for FilterAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped review {}: {}",
            self.recommendation_id.as_deref().unwrap_or("<unknown>"),
            self.reason
        )
    }
}

impl std::error::Error for FilterAnomaly {}

/// Raw author sub-object as served by the API
#[derive(Debug, Deserialize)]
struct RawAuthor {
    steamid: String,
    #[serde(default)]
    playtime_at_review: u64,
}

/// Raw review entry as served by the API
#[derive(Debug, Deserialize)]
struct RawReview {
    recommendationid: String,
    author: RawAuthor,
    timestamp_created: i64,
    timestamp_updated: i64,
    review: String,
    voted_up: bool,
    votes_up: u64,
    votes_funny: u64,
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    weighted_vote_score: f64,
    #[serde(default)]
    comment_count: u64,
    language: String,
    #[serde(default)]
    received_for_free: bool,
    #[serde(default)]
    steam_purchase: bool,
}

/// The API serves `weighted_vote_score` as either `0` or `"0.52380955"`
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Score {
        Number(f64),
        Text(String),
    }

    let score = match Score::deserialize(deserializer)? {
        Score::Number(n) => n,
        Score::Text(s) => s.trim().parse::<f64>().map_err(D::Error::custom)?,
    };
    // NaN and infinities would be written out as `null`
    if !score.is_finite() {
        return Err(D::Error::custom(format!(
            "weighted_vote_score {} is not a finite number",
            score
        )));
    }
    Ok(score)
}

fn timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| format!("{} {} is out of range", field, secs))
}

/// Decides which raw entries become output reviews
#[derive(Debug, Clone)]
pub struct ReviewFilter {
    app_id: AppId,
    range: DateRange,
    anonymize: bool,
    details: Option<AppDetails>,
}

impl ReviewFilter {
    pub fn new(app_id: AppId, range: DateRange) -> Self {
        Self {
            app_id,
            range,
            anonymize: false,
            details: None,
        }
    }

    /// Replaces reviewer ids with their SHA-256 digest
    pub fn anonymize_reviewers(mut self, anonymize: bool) -> Self {
        self.anonymize = anonymize;
        self
    }

    /// Labels every following review with the app's name and developers
    pub fn set_app_details(&mut self, details: AppDetails) {
        self.details = Some(details);
    }

    pub fn app_details(&self) -> Option<&AppDetails> {
        self.details.as_ref()
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// Maps one raw entry and applies the date range
    ///
    /// # Returns
    ///
    /// * `Ok(FilterDecision)` - The entry decoded; see the decision for inclusion
    /// * `Err(FilterAnomaly)` - A required field was missing or mistyped
    pub fn accept(&self, entry: &Value) -> Result<FilterDecision, FilterAnomaly> {
        let review = self.to_review(entry)?;
        let submitted = review.submitted_at();

        if self.range.is_before(submitted) {
            Ok(FilterDecision::OutOfRangeHint)
        } else if self.range.is_after(submitted) {
            Ok(FilterDecision::Excluded)
        } else {
            Ok(FilterDecision::Included(review))
        }
    }

    /// Maps one raw entry into a `Review` without applying the range
    pub fn to_review(&self, entry: &Value) -> Result<Review, FilterAnomaly> {
        let anomaly = |reason: String| FilterAnomaly {
            recommendation_id: entry
                .get("recommendationid")
                .and_then(Value::as_str)
                .map(str::to_string),
            reason,
        };

        let raw = RawReview::deserialize(entry).map_err(|e| anomaly(e.to_string()))?;
        let submitted_at = timestamp(raw.timestamp_created, "timestamp_created").map_err(anomaly)?;
        let updated_at = timestamp(raw.timestamp_updated, "timestamp_updated").map_err(anomaly)?;

        let id = content_id(self.app_id, &raw.review, &raw.author.steamid);
        let reviewer_id = if self.anonymize {
            anonymize_reviewer(&raw.author.steamid)
        } else {
            raw.author.steamid
        };

        Ok(Review {
            id,
            app_id: self.app_id,
            app_name: self.details.as_ref().map(|d| d.name.clone()),
            developers: self
                .details
                .as_ref()
                .map(|d| d.developers.clone())
                .unwrap_or_default(),
            recommendation_id: raw.recommendationid,
            reviewer_id,
            submitted_at,
            updated_at,
            playtime_at_review_minutes: raw.author.playtime_at_review,
            text: raw.review,
            votes_helpful: raw.votes_up,
            votes_funny: raw.votes_funny,
            weighted_vote_score: raw.weighted_vote_score,
            comment_count: raw.comment_count,
            language: raw.language,
            received_for_free: raw.received_for_free,
            verified_purchase: raw.steam_purchase,
            recommended: raw.voted_up,
        })
    }
}
