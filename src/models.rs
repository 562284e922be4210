//! Data models for the review analyzer.
//!
//! This module contains all the core data structures used throughout
//! the application for representing reviews, extracted issues, and
//! sentiment analysis results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard ceiling on reviews per batch, imposed by the Play Store endpoint.
pub const MAX_REVIEWS: usize = 50;

/// Where a review was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Playstore,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Playstore => write!(f, "playstore"),
        }
    }
}

/// A single normalized app review. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Review origin.
    pub source: Source,
    /// Review body text.
    pub text: String,
    /// Star rating, 1-5.
    pub score: u8,
    /// Review date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
}

/// Sentinel record produced when the fetch step fails.
///
/// Callers check for this shape in the batch rather than relying on
/// a raised error; the failure flows downstream as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Always `"error"`.
    pub status: String,
    /// Human-readable failure description.
    pub message: String,
}

impl FetchFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// One entry in a review batch: either a real review or the error sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewEntry {
    Review(ReviewRecord),
    Error(FetchFailure),
}

/// An ordered batch of review entries, capped at [`MAX_REVIEWS`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewBatch {
    pub reviews: Vec<ReviewEntry>,
}

impl ReviewBatch {
    /// Build a batch from fetched records, truncating to the ceiling.
    pub fn from_records(mut records: Vec<ReviewRecord>) -> Self {
        records.truncate(MAX_REVIEWS);
        Self {
            reviews: records.into_iter().map(ReviewEntry::Review).collect(),
        }
    }

    /// Build the single-entry sentinel batch for a failed fetch.
    pub fn from_failure(failure: FetchFailure) -> Self {
        Self {
            reviews: vec![ReviewEntry::Error(failure)],
        }
    }

    /// All real review records in the batch, in order.
    pub fn records(&self) -> Vec<&ReviewRecord> {
        self.reviews
            .iter()
            .filter_map(|e| match e {
                ReviewEntry::Review(r) => Some(r),
                ReviewEntry::Error(_) => None,
            })
            .collect()
    }

    /// The fetch failure sentinel, if this batch carries one.
    pub fn failure(&self) -> Option<&FetchFailure> {
        self.reviews.iter().find_map(|e| match e {
            ReviewEntry::Error(f) => Some(f),
            ReviewEntry::Review(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

/// Category tag for an extracted issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueTag {
    Bug,
    Crash,
    Ui,
    Performance,
    FeatureRequest,
    Other,
}

impl fmt::Display for IssueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueTag::Bug => write!(f, "bug"),
            IssueTag::Crash => write!(f, "crash"),
            IssueTag::Ui => write!(f, "ui"),
            IssueTag::Performance => write!(f, "performance"),
            IssueTag::FeatureRequest => write!(f, "feature_request"),
            IssueTag::Other => write!(f, "other"),
        }
    }
}

/// Priority level of an extracted issue.
///
/// Ordered so that `High > Medium > Low`, which the report generator
/// relies on for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

impl Priority {
    /// Returns an emoji representation of the priority.
    pub fn emoji(&self) -> &'static str {
        match self {
            Priority::Low => "🟢",
            Priority::Medium => "🟡",
            Priority::High => "🔴",
        }
    }
}

/// A single user-reported issue extracted from a review batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    /// The reported issue in one sentence.
    pub issue: String,
    /// Issue category.
    pub tag: IssueTag,
    /// Priority based on user urgency or impact.
    pub priority: Priority,
}

/// Sentiment label for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// The fixed three-category domain, in chart order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// Weight used for the aggregate sentiment scale.
    pub fn weight(&self) -> f64 {
        match self {
            Sentiment::Positive => 10.0,
            Sentiment::Neutral => 5.0,
            Sentiment::Negative => 0.0,
        }
    }

    /// Index into count arrays ordered positive/neutral/negative.
    pub fn index(&self) -> usize {
        match self {
            Sentiment::Positive => 0,
            Sentiment::Neutral => 1,
            Sentiment::Negative => 2,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Per-review sentiment analysis result. Carries the original review fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub source: Source,
    pub text: String,
    pub score: u8,
    pub date: NaiveDate,
    /// Detected sentiment label.
    pub sentiment: Sentiment,
    /// Sentiment confidence, 0 to 1.
    pub confidence: f32,
    /// True if the user sounds upset.
    pub frustrated: bool,
    /// True if a sarcastic tone was detected.
    pub sarcastic: bool,
}

/// Aggregate sentiment summary (alternate output mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Weighted mean on a 0-10 scale (positive=10, neutral=5, negative=0).
    pub sentiment_scale: f64,
    /// Counts as `[positive, neutral, negative]`.
    pub sentiment_count: [usize; 3],
}

/// A rendered chart file and its retrieval path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    /// Absolute path of the PNG on disk.
    pub file_path: std::path::PathBuf,
    /// Root-relative path for retrieval, e.g. `/static/sentiment_bar_...png`.
    pub public_path: String,
}
