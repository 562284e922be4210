//! Sentiment analysis sub-agent.
//!
//! Same declarative pattern as the issue agent, with two extras: the
//! chart renderer is exposed to the model as tools during the chat,
//! and operator-requested chart kinds are rendered after analysis so
//! the artifacts are produced even when the model never calls a tool.
//! Every chart path is surfaced verbatim in the analysis result.

use crate::agent::agent_loop::{extract_json_object, AgentConfig, AgentRuntime, ChatMessage};
use crate::agent::tools::{chart_tool_definitions, ChartToolExecutor, ToolCall};
use crate::analysis::{sentiment_labels, summarize_sentiments};
use crate::chart::ChartKind;
use crate::models::{ChartArtifact, ReviewBatch, SentimentReport, SentimentSummary};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

pub const SENTIMENT_AGENT_NAME: &str = "sentiment_analysis_agent";

const SENTIMENT_SYSTEM_PROMPT: &str = r#"You are a review analysis expert.
Given a list of user reviews (with rating, source, and date), analyze each one and return:
- sentiment: "positive", "neutral", or "negative"
- confidence: float (0 to 1)
- frustrated: true if the user is upset
- sarcastic: true if a sarcastic tone is detected

Each entry in the response must retain the original fields: source, text, score, and date.
You may call the plotting tools to render sentiment charts; include any returned chart path verbatim.

Respond ONLY with valid JSON of the form:
{"results": [{"source": "...", "text": "...", "score": 1, "date": "YYYY-MM-DD", "sentiment": "...", "confidence": 0.0, "frustrated": false, "sarcastic": false}]}
"#;

/// Expected response shape.
#[derive(Debug, Deserialize)]
struct SentimentBatchOutput {
    results: Vec<SentimentReport>,
}

/// Full result of a sentiment analysis run.
#[derive(Debug, Clone)]
pub struct SentimentAnalysis {
    /// Per-review sentiment reports.
    pub results: Vec<SentimentReport>,
    /// Aggregate summary, present in aggregate mode.
    pub summary: Option<SentimentSummary>,
    /// Chart artifacts, in render order, paths verbatim.
    pub charts: Vec<ChartArtifact>,
}

/// The sentiment analysis agent.
pub struct SentimentAnalysisAgent {
    runtime: AgentRuntime,
    executor: ChartToolExecutor,
}

impl SentimentAnalysisAgent {
    pub fn new(config: AgentConfig, executor: ChartToolExecutor) -> Self {
        Self {
            runtime: AgentRuntime::new(config),
            executor,
        }
    }

    /// Analyze a review batch.
    ///
    /// `charts` are the operator-requested kinds; any of them the model
    /// did not already render via a tool call are rendered afterwards.
    pub async fn analyze(
        &mut self,
        batch: &ReviewBatch,
        charts: &[ChartKind],
        aggregate: bool,
    ) -> Result<SentimentAnalysis> {
        info!(
            "{}: analyzing {} entries",
            SENTIMENT_AGENT_NAME,
            batch.len()
        );

        let reviews_json =
            serde_json::to_string_pretty(&batch.reviews).context("Failed to serialize batch")?;

        let mut messages = vec![
            ChatMessage::system(SENTIMENT_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Analyze the sentiment of these app reviews:\n\n{}",
                reviews_json
            )),
        ];

        let tools: Vec<Value> = chart_tool_definitions()
            .iter()
            .map(|t| serde_json::to_value(t).expect("tool definition serializes"))
            .collect();

        let mut results: Option<Vec<SentimentReport>> = None;

        for _ in 0..self.runtime.config().max_iterations {
            let response = self.runtime.chat(&messages, &tools).await?;

            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            match response.tool_calls {
                Some(tool_calls) if !tool_calls.is_empty() => {
                    for tool_call in tool_calls {
                        let call = ToolCall {
                            name: tool_call.function.name.clone(),
                            arguments: tool_call.function.arguments.clone(),
                        };

                        let result = self.executor.execute(&call);
                        let content = if result.success {
                            result.output
                        } else {
                            format!("Error: {}", result.error.unwrap_or_default())
                        };
                        messages.push(ChatMessage::tool(content));

                        info!("Tool {} executed", call.name);
                    }
                }
                _ => {
                    results = Some(parse_sentiment_response(&response.content)?);
                    break;
                }
            }
        }

        let Some(results) = results else {
            bail!(
                "{} did not return results within {} iterations",
                SENTIMENT_AGENT_NAME,
                self.runtime.config().max_iterations
            );
        };

        info!("{}: analyzed {} reviews", SENTIMENT_AGENT_NAME, results.len());

        // Requested charts are deterministic regardless of model behavior.
        self.executor.seed(
            sentiment_labels(&results),
            results.iter().map(|r| r.date).collect(),
        );
        for kind in charts {
            if self.executor.has_rendered(*kind) {
                continue;
            }
            let result = self.executor.render_kind(*kind);
            if !result.success {
                warn!(
                    "Requested {} chart could not be rendered: {}",
                    kind,
                    result.error.unwrap_or_default()
                );
            }
        }

        let summary = aggregate.then(|| summarize_sentiments(&results));

        Ok(SentimentAnalysis {
            results,
            summary,
            charts: self.executor.artifacts().to_vec(),
        })
    }
}

/// Parse and validate the agent reply against the sentiment schema.
///
/// Confidence values are clamped into [0, 1].
pub(crate) fn parse_sentiment_response(reply: &str) -> Result<Vec<SentimentReport>> {
    let payload = extract_json_object(reply)
        .with_context(|| format!("No JSON object in sentiment agent reply: {}", reply))?;

    let output: SentimentBatchOutput = serde_json::from_str(payload)
        .with_context(|| format!("Sentiment agent reply violates schema: {}", payload))?;

    let mut results = output.results;
    for report in &mut results {
        report.confidence = report.confidence.clamp(0.0, 1.0);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;

    #[test]
    fn test_parse_sentiment_response() {
        let reply = r#"{"results": [
            {"source": "playstore", "text": "Love it", "score": 5, "date": "2024-06-01",
             "sentiment": "positive", "confidence": 0.97, "frustrated": false, "sarcastic": false},
            {"source": "playstore", "text": "Great, another crash. Amazing.", "score": 1, "date": "2024-06-02",
             "sentiment": "negative", "confidence": 0.88, "frustrated": true, "sarcastic": true}
        ]}"#;

        let results = parse_sentiment_response(reply).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sentiment, Sentiment::Positive);
        assert!(results[1].sarcastic);
    }

    #[test]
    fn test_parse_sentiment_response_clamps_confidence() {
        let reply = r#"{"results": [
            {"source": "playstore", "text": "ok", "score": 3, "date": "2024-06-01",
             "sentiment": "neutral", "confidence": 1.7, "frustrated": false, "sarcastic": false}
        ]}"#;

        let results = parse_sentiment_response(reply).unwrap();
        assert_eq!(results[0].confidence, 1.0);
    }

    #[test]
    fn test_parse_sentiment_response_rejects_unknown_label() {
        let reply = r#"{"results": [
            {"source": "playstore", "text": "ok", "score": 3, "date": "2024-06-01",
             "sentiment": "mixed", "confidence": 0.5, "frustrated": false, "sarcastic": false}
        ]}"#;
        assert!(parse_sentiment_response(reply).is_err());
    }

    #[test]
    fn test_parse_sentiment_response_rejects_prose() {
        assert!(parse_sentiment_response("The reviews look mostly positive!").is_err());
    }
}
