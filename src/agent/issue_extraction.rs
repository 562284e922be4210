//! Issue extraction sub-agent.
//!
//! Declarative prompt-plus-schema component: the review batch goes out
//! as JSON, a flat list of `{issue, tag, priority}` objects comes back.
//! All intelligence lives in the prompt; this module only enforces the
//! schema contract.

use crate::agent::agent_loop::{extract_json_object, AgentConfig, AgentRuntime, ChatMessage};
use crate::models::{IssueReport, ReviewBatch};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

pub const ISSUE_AGENT_NAME: &str = "extract_issues_agent";

const ISSUE_SYSTEM_PROMPT: &str = r#"You are an AI assistant that identifies problems in software applications based on user reviews.

Instructions:
- Read each review and extract only specific issues mentioned (bugs, crashes, UI glitches, performance lags, or missing features).
- Do not include the original review text in the output.
- For each issue:
  - Write a short one-line description.
  - Assign a tag: "bug", "crash", "ui", "performance", "feature_request", or "other".
  - Assign a priority: "high", "medium", or "low" based on user urgency or impact.

Respond ONLY with valid JSON of the form:
{"results": [{"issue": "...", "tag": "...", "priority": "..."}]}
"#;

/// Expected response shape.
#[derive(Debug, Deserialize)]
struct IssueBatchOutput {
    results: Vec<IssueReport>,
}

/// The issue extraction agent.
pub struct IssueExtractionAgent {
    runtime: AgentRuntime,
}

impl IssueExtractionAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            runtime: AgentRuntime::new(config),
        }
    }

    /// Extract issue reports from a review batch in a single structured call.
    pub async fn extract(&self, batch: &ReviewBatch) -> Result<Vec<IssueReport>> {
        info!(
            "{}: extracting issues from {} entries",
            ISSUE_AGENT_NAME,
            batch.len()
        );

        let reviews_json =
            serde_json::to_string_pretty(&batch.reviews).context("Failed to serialize batch")?;

        let messages = vec![
            ChatMessage::system(ISSUE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Extract the issues from these app reviews:\n\n{}",
                reviews_json
            )),
        ];

        let response = self.runtime.chat(&messages, &[]).await?;
        let issues = parse_issue_response(&response.content)?;

        info!("{}: extracted {} issues", ISSUE_AGENT_NAME, issues.len());
        Ok(issues)
    }
}

/// Parse and validate the agent reply against the issue schema.
pub(crate) fn parse_issue_response(reply: &str) -> Result<Vec<IssueReport>> {
    let payload = extract_json_object(reply)
        .with_context(|| format!("No JSON object in issue agent reply: {}", reply))?;

    let output: IssueBatchOutput = serde_json::from_str(payload)
        .with_context(|| format!("Issue agent reply violates schema: {}", payload))?;

    Ok(output.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueTag, Priority};

    #[test]
    fn test_parse_issue_response() {
        let reply = r#"{"results": [
            {"issue": "App crashes when opening settings", "tag": "crash", "priority": "high"},
            {"issue": "Dark mode toggle is missing", "tag": "feature_request", "priority": "low"}
        ]}"#;

        let issues = parse_issue_response(reply).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].tag, IssueTag::Crash);
        assert_eq!(issues[0].priority, Priority::High);
        assert_eq!(issues[1].tag, IssueTag::FeatureRequest);
    }

    #[test]
    fn test_parse_issue_response_fenced() {
        let reply = "```json\n{\"results\": [{\"issue\": \"Slow load\", \"tag\": \"performance\", \"priority\": \"medium\"}]}\n```";
        let issues = parse_issue_response(reply).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].tag, IssueTag::Performance);
    }

    #[test]
    fn test_parse_issue_response_rejects_unknown_tag() {
        let reply = r#"{"results": [{"issue": "x", "tag": "urgent", "priority": "high"}]}"#;
        assert!(parse_issue_response(reply).is_err());
    }

    #[test]
    fn test_parse_issue_response_rejects_prose() {
        assert!(parse_issue_response("I found no issues in these reviews.").is_err());
    }
}
