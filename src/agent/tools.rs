//! Chart tools for the sentiment analysis agent.
//!
//! The sentiment agent exposes the chart renderer to the model as
//! Ollama tool definitions; this module defines those tools and the
//! executor that services tool calls. Every rendered artifact path is
//! collected so the agent can surface it verbatim in its response.

use crate::chart::{ChartKind, SentimentChartRenderer};
use crate::models::{ChartArtifact, Sentiment};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Tool definition for Ollama's tool-calling API.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }
}

/// Executes chart tool calls against the renderer.
///
/// Label and date arguments supplied by the model take precedence;
/// when absent the executor falls back to the data seeded from the
/// analyzed batch.
pub struct ChartToolExecutor {
    renderer: SentimentChartRenderer,
    labels: Vec<Sentiment>,
    dates: Vec<NaiveDate>,
    artifacts: Vec<ChartArtifact>,
}

impl ChartToolExecutor {
    pub fn new(renderer: SentimentChartRenderer) -> Self {
        Self {
            renderer,
            labels: Vec::new(),
            dates: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Seed the fallback data from analyzed sentiment results.
    pub fn seed(&mut self, labels: Vec<Sentiment>, dates: Vec<NaiveDate>) {
        self.labels = labels;
        self.dates = dates;
    }

    /// Chart artifacts rendered so far, in call order.
    pub fn artifacts(&self) -> &[ChartArtifact] {
        &self.artifacts
    }

    /// Whether a chart of the given kind has already been rendered.
    pub fn has_rendered(&self, kind: ChartKind) -> bool {
        let marker = format!("sentiment_{}_", kind);
        self.artifacts
            .iter()
            .any(|a| a.public_path.contains(&marker))
    }

    /// Execute a tool call and return the result.
    pub fn execute(&mut self, call: &ToolCall) -> ToolResult {
        debug!("Executing tool: {} with args: {:?}", call.name, call.arguments);

        let kind = match call.name.as_str() {
            "plot_sentiment_bar" => ChartKind::Bar,
            "plot_sentiment_pie" => ChartKind::Pie,
            "plot_sentiment_line" => ChartKind::Line,
            other => return ToolResult::error(format!("Unknown tool: {}", other)),
        };

        self.render(kind, &call.arguments)
    }

    /// Render the requested chart kind directly (operator-driven path).
    pub fn render_kind(&mut self, kind: ChartKind) -> ToolResult {
        self.render(kind, &Value::Null)
    }

    fn render(&mut self, kind: ChartKind, args: &Value) -> ToolResult {
        let labels = match parse_labels(args) {
            Some(labels) if !labels.is_empty() => labels,
            _ => self.labels.clone(),
        };
        let dates = match parse_dates(args) {
            Some(dates) if !dates.is_empty() => dates,
            _ => self.dates.clone(),
        };

        match self.renderer.render(kind, &labels, &dates) {
            Ok(artifact) => {
                let path = artifact.public_path.clone();
                self.artifacts.push(artifact);
                ToolResult::success(path)
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

fn parse_labels(args: &Value) -> Option<Vec<Sentiment>> {
    let raw = args.get("sentiments")?.as_array()?;
    let mut labels = Vec::with_capacity(raw.len());
    for value in raw {
        let label: Sentiment = serde_json::from_value(value.clone()).ok()?;
        labels.push(label);
    }
    Some(labels)
}

fn parse_dates(args: &Value) -> Option<Vec<NaiveDate>> {
    let raw = args.get("dates")?.as_array()?;
    let mut dates = Vec::with_capacity(raw.len());
    for value in raw {
        let date: NaiveDate = value.as_str()?.parse().ok()?;
        dates.push(date);
    }
    Some(dates)
}

/// Tool definitions offered to the sentiment agent.
pub fn chart_tool_definitions() -> Vec<ToolDefinition> {
    let sentiments_param = json!({
        "type": "array",
        "items": {"type": "string", "enum": ["positive", "neutral", "negative"]},
        "description": "Sentiment labels, one per review"
    });

    vec![
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: "plot_sentiment_bar".to_string(),
                description: "Render a bar chart of sentiment counts. Returns the chart's retrieval path.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "sentiments": sentiments_param.clone()
                    },
                    "required": ["sentiments"]
                }),
            },
        },
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: "plot_sentiment_pie".to_string(),
                description: "Render a pie chart of the sentiment distribution. Returns the chart's retrieval path.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "sentiments": sentiments_param.clone()
                    },
                    "required": ["sentiments"]
                }),
            },
        },
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: "plot_sentiment_line".to_string(),
                description: "Render a line chart of sentiment counts over time. Returns the chart's retrieval path.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "sentiments": sentiments_param,
                        "dates": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Dates (YYYY-MM-DD) parallel to the sentiment labels"
                        }
                    },
                    "required": ["sentiments", "dates"]
                }),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn executor(dir: &TempDir) -> ChartToolExecutor {
        ChartToolExecutor::new(SentimentChartRenderer::new(dir.path(), "/static"))
    }

    #[test]
    fn test_tool_definitions() {
        let tools = chart_tool_definitions();
        assert_eq!(tools.len(), 3);

        let names: Vec<_> = tools.iter().map(|t| t.function.name.as_str()).collect();
        assert!(names.contains(&"plot_sentiment_bar"));
        assert!(names.contains(&"plot_sentiment_pie"));
        assert!(names.contains(&"plot_sentiment_line"));
    }

    #[test]
    fn test_execute_bar_with_args() {
        let dir = TempDir::new().unwrap();
        let mut executor = executor(&dir);

        let call = ToolCall {
            name: "plot_sentiment_bar".to_string(),
            arguments: json!({"sentiments": ["positive", "positive", "negative"]}),
        };
        let result = executor.execute(&call);

        assert!(result.success, "error: {:?}", result.error);
        assert!(result.output.starts_with("/static/sentiment_bar_"));
        assert_eq!(executor.artifacts().len(), 1);
        assert!(executor.has_rendered(ChartKind::Bar));
        assert!(!executor.has_rendered(ChartKind::Pie));
    }

    #[test]
    fn test_execute_falls_back_to_seeded_data() {
        let dir = TempDir::new().unwrap();
        let mut executor = executor(&dir);
        executor.seed(
            vec![Sentiment::Positive, Sentiment::Negative],
            vec!["2024-06-01".parse().unwrap(), "2024-06-02".parse().unwrap()],
        );

        let call = ToolCall {
            name: "plot_sentiment_line".to_string(),
            arguments: json!({}),
        };
        let result = executor.execute(&call);

        assert!(result.success, "error: {:?}", result.error);
        assert!(result.output.starts_with("/static/sentiment_line_"));
    }

    #[test]
    fn test_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let mut executor = executor(&dir);

        let call = ToolCall {
            name: "delete_everything".to_string(),
            arguments: json!({}),
        };
        let result = executor.execute(&call);

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown tool"));
    }

    #[test]
    fn test_execute_without_data_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let mut executor = executor(&dir);

        let call = ToolCall {
            name: "plot_sentiment_pie".to_string(),
            arguments: json!({}),
        };
        let result = executor.execute(&call);

        assert!(!result.success);
    }
}
