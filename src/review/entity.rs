//! Canonical review record written to the output chunks

use crate::review::AppId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single accepted review
///
/// Built only by the review filter from a raw API entry; the fields are
/// read-only outside the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Stable content id (hex SHA-256 of app id, text and raw reviewer id)
    pub(crate) id: String,
    pub(crate) app_id: AppId,
    /// Store name of the app, when app details were looked up
    #[serde(default)]
    pub(crate) app_name: Option<String>,
    /// Developers of the app; empty when unknown
    #[serde(default)]
    pub(crate) developers: Vec<String>,
    pub(crate) recommendation_id: String,
    pub(crate) reviewer_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub(crate) submitted_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) playtime_at_review_minutes: u64,
    pub(crate) text: String,
    pub(crate) votes_helpful: u64,
    pub(crate) votes_funny: u64,
    pub(crate) weighted_vote_score: f64,
    pub(crate) comment_count: u64,
    pub(crate) language: String,
    pub(crate) received_for_free: bool,
    pub(crate) verified_purchase: bool,
    pub(crate) recommended: bool,
}

impl Review {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn developers(&self) -> &[String] {
        &self.developers
    }

    pub fn recommendation_id(&self) -> &str {
        &self.recommendation_id
    }

    pub fn reviewer_id(&self) -> &str {
        &self.reviewer_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn playtime_at_review_minutes(&self) -> u64 {
        self.playtime_at_review_minutes
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn votes_helpful(&self) -> u64 {
        self.votes_helpful
    }

    pub fn votes_funny(&self) -> u64 {
        self.votes_funny
    }

    pub fn weighted_vote_score(&self) -> f64 {
        self.weighted_vote_score
    }

    pub fn comment_count(&self) -> u64 {
        self.comment_count
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn received_for_free(&self) -> bool {
        self.received_for_free
    }

    pub fn verified_purchase(&self) -> bool {
        self.verified_purchase
    }

    pub fn recommended(&self) -> bool {
        self.recommended
    }
}

/// Content id for a review, stable across runs and anonymization settings
pub fn content_id(app_id: AppId, text: &str, reviewer_id: &str) -> String {
    sha256_hex(&format!("{}-{}-{}", app_id, text, reviewer_id).to_lowercase())
}

/// Irreversible stand-in for a reviewer id
pub fn anonymize_reviewer(reviewer_id: &str) -> String {
    sha256_hex(reviewer_id)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
