//! Play Store review fetching.
//!
//! This module extracts the application id from a store URL, requests
//! newest-sorted reviews from the Play Store `batchexecute` endpoint
//! (the same wire protocol the google-play-scraper libraries speak),
//! and normalizes the raw entries into [`ReviewRecord`] values.
//!
//! The public entry point never raises: a failed fetch degrades into a
//! single-entry sentinel batch (`{"status": "error", "message": ...}`)
//! that flows downstream as data.

use crate::models::{FetchFailure, ReviewBatch, ReviewRecord, Source, MAX_REVIEWS};
use chrono::DateTime;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default Play Store host.
pub const DEFAULT_BASE_URL: &str = "https://play.google.com";

/// RPC id of the review listing endpoint.
const REVIEWS_RPC_ID: &str = "UsvDTd";

/// Sort order 2 = newest first.
const SORT_NEWEST: u8 = 2;

/// Typed failure of the fetch step. Degraded to a [`FetchFailure`]
/// sentinel before reaching the agents.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no app id found in URL (expected id=<package.name>): {0}")]
    MissingAppId(String),
    #[error("Play Store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected Play Store response: {0}")]
    Malformed(String),
}

/// Extract the `id=<package.name>` parameter from a store URL.
///
/// Accepts word characters and dots, matching the package-name grammar.
pub fn extract_app_id(url: &str) -> Option<String> {
    let start = url.find("id=")? + 3;
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect();

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Settings for the Play Store client.
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub base_url: String,
    pub lang: String,
    pub country: String,
    pub timeout_seconds: u64,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: "en".to_string(),
            country: "us".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// HTTP client for the Play Store review endpoint.
pub struct PlayStoreClient {
    http: reqwest::Client,
    settings: FetcherSettings,
}

impl PlayStoreClient {
    pub fn new(settings: FetcherSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { http, settings }
    }

    /// Fetch up to `count` newest reviews for an app id.
    ///
    /// `count` is clamped to the endpoint ceiling of 50 per request.
    pub async fn fetch_reviews(
        &self,
        app_id: &str,
        count: usize,
    ) -> Result<Vec<ReviewRecord>, FetchError> {
        let count = count.clamp(1, MAX_REVIEWS);

        let url = format!(
            "{}/_/PlayStoreUi/data/batchexecute?hl={}&gl={}",
            self.settings.base_url, self.settings.lang, self.settings.country
        );

        let inner = format!(
            r#"[null,null,[2,{},[{},null,null],null,[]],["{}",7]]"#,
            SORT_NEWEST, count, app_id
        );
        let envelope = format!(
            r#"[[["{}","{}",null,"generic"]]]"#,
            REVIEWS_RPC_ID,
            inner.replace('\\', "\\\\").replace('"', "\\\"")
        );

        debug!("Requesting {} reviews for {}", count, app_id);

        let response = self
            .http
            .post(&url)
            .form(&[("f.req", envelope.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let records = parse_review_payload(&body, count)?;

        info!("Fetched {} reviews for {}", records.len(), app_id);
        Ok(records)
    }
}

/// Parse the `)]}'`-prefixed batchexecute envelope into review records.
///
/// The envelope wraps a JSON string payload; the reviews live in the
/// first element of the re-parsed payload. Entries that do not carry
/// the expected fields are skipped with a warning.
pub fn parse_review_payload(body: &str, limit: usize) -> Result<Vec<ReviewRecord>, FetchError> {
    let trimmed = body.trim_start().trim_start_matches(")]}'").trim_start();

    let envelope: Value = serde_json::from_str(trimmed)
        .map_err(|e| FetchError::Malformed(format!("invalid envelope JSON: {}", e)))?;

    let payload_str = envelope
        .as_array()
        .and_then(|chunks| {
            chunks.iter().find_map(|chunk| {
                let parts = chunk.as_array()?;
                if parts.first()?.as_str()? == "wrb.fr"
                    && parts.get(1)?.as_str()? == REVIEWS_RPC_ID
                {
                    parts.get(2)?.as_str()
                } else {
                    None
                }
            })
        })
        .ok_or_else(|| FetchError::Malformed("no review payload in envelope".to_string()))?;

    let payload: Value = serde_json::from_str(payload_str)
        .map_err(|e| FetchError::Malformed(format!("invalid payload JSON: {}", e)))?;

    let raw_reviews = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed("payload has no review list".to_string()))?;

    let mut records = Vec::new();
    for raw in raw_reviews.iter().take(limit) {
        match map_review(raw) {
            Some(record) => records.push(record),
            None => warn!("Skipping malformed review entry"),
        }
    }

    Ok(records)
}

/// Map one raw review array to a [`ReviewRecord`].
///
/// Field positions follow the batchexecute layout: score at 2, body
/// text at 4, timestamp seconds at [5][0].
fn map_review(raw: &Value) -> Option<ReviewRecord> {
    let score = raw.get(2)?.as_i64()?;
    if !(1..=5).contains(&score) {
        return None;
    }

    let text = raw.get(4)?.as_str()?.to_string();
    let seconds = raw.get(5)?.get(0)?.as_i64()?;
    let date = DateTime::from_timestamp(seconds, 0)?.date_naive();

    Some(ReviewRecord {
        source: Source::Playstore,
        text,
        score: score as u8,
        date,
    })
}

/// The review fetcher: URL in, batch out, never raises.
pub struct ReviewFetcher {
    client: PlayStoreClient,
}

impl ReviewFetcher {
    pub fn new(settings: FetcherSettings) -> Self {
        Self {
            client: PlayStoreClient::new(settings),
        }
    }

    /// Fetch a review batch for a store URL.
    ///
    /// On any failure (missing app id, network, malformed response) the
    /// returned batch holds exactly one sentinel entry; the caller
    /// checks [`ReviewBatch::failure`] rather than handling an error.
    pub async fn fetch_batch(&self, app_url: &str, count: usize) -> ReviewBatch {
        let app_id = match extract_app_id(app_url) {
            Some(id) => id,
            None => {
                warn!("No app id in URL: {}", app_url);
                return ReviewBatch::from_failure(FetchFailure::new(format!(
                    "Failed to fetch reviews: no app id found in URL: {}",
                    app_url
                )));
            }
        };

        match self.client.fetch_reviews(&app_id, count).await {
            Ok(records) => ReviewBatch::from_records(records),
            Err(e) => {
                warn!("Fetch failed for {}: {}", app_id, e);
                ReviewBatch::from_failure(FetchFailure::new(format!(
                    "Failed to fetch reviews: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_app_id() {
        assert_eq!(
            extract_app_id("https://play.google.com/store/apps/details?id=com.example.app"),
            Some("com.example.app".to_string())
        );
        assert_eq!(
            extract_app_id("https://play.google.com/store/apps/details?id=org.mozilla.firefox&hl=en"),
            Some("org.mozilla.firefox".to_string())
        );
    }

    #[test]
    fn test_extract_app_id_malformed() {
        assert_eq!(extract_app_id("https://play.google.com/store/apps"), None);
        assert_eq!(extract_app_id("https://example.com/?id="), None);
    }

    fn fixture_body() -> String {
        // Two reviews: 5 stars on 2024-06-01, 1 star on 2024-05-31.
        let reviews = serde_json::json!([
            [
                ["gp:review1"],
                ["Alice"],
                5,
                null,
                "Love this app, works great",
                [1717200000, 0]
            ],
            [
                ["gp:review2"],
                ["Bob"],
                1,
                null,
                "Crashes on startup since the update",
                [1717113600, 0]
            ],
            [["gp:broken"], ["Eve"]]
        ]);
        let payload = serde_json::json!([reviews, null]).to_string();
        let envelope = serde_json::json!([["wrb.fr", "UsvDTd", payload, null]]);
        format!(")]}}'\n\n{}", envelope)
    }

    #[test]
    fn test_parse_review_payload() {
        let records = parse_review_payload(&fixture_body(), 50).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].score, 5);
        assert_eq!(records[0].text, "Love this app, works great");
        assert_eq!(records[0].date.to_string(), "2024-06-01");
        assert_eq!(records[0].source, Source::Playstore);

        assert_eq!(records[1].score, 1);
        assert_eq!(records[1].date.to_string(), "2024-05-31");
    }

    #[test]
    fn test_parse_review_payload_respects_limit() {
        let records = parse_review_payload(&fixture_body(), 1).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_review_payload_rejects_garbage() {
        assert!(parse_review_payload("not json at all", 50).is_err());
        assert!(parse_review_payload(")]}'\n[[\"wrb.fr\",\"Other\",\"[]\",null]]", 50).is_err());
    }

    #[tokio::test]
    async fn test_fetch_batch_malformed_url_returns_sentinel() {
        let fetcher = ReviewFetcher::new(FetcherSettings::default());
        let batch = fetcher.fetch_batch("https://play.google.com/store/apps", 50).await;

        assert_eq!(batch.len(), 1);
        let failure = batch.failure().expect("expected sentinel entry");
        assert_eq!(failure.status, "error");
        assert!(failure.message.contains("Failed to fetch reviews"));
    }
}
