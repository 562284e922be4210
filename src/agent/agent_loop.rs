//! Shared runtime for the LLM-backed sub-agents.
//!
//! This module owns the Ollama `/api/chat` wire types and the HTTP
//! client both sub-agents use. Transient failures (timeouts, refused
//! connections) are retried a bounded number of times; schema
//! violations in agent replies are hard errors for the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the agent runtime.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Retries for transient HTTP failures.
    pub retries: usize,
    /// Upper bound on tool-calling round trips.
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 300,
            retries: 3,
            max_iterations: 8,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallMessage>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: Value,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallMessage>>,
}

/// HTTP runtime shared by the sub-agents.
pub struct AgentRuntime {
    config: AgentConfig,
    http_client: reqwest::Client,
}

impl AgentRuntime {
    pub fn new(config: AgentConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Send a chat request, retrying transient failures.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<ResponseMessage> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let request = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request with {} messages", messages.len());

        let mut attempt = 0;
        let response = loop {
            match self.http_client.post(&url).json(&request).send().await {
                Ok(response) => break response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        "Transient LLM request failure (attempt {}/{}): {}",
                        attempt, self.config.retries, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => {
                    return Err(if e.is_timeout() {
                        anyhow::anyhow!(
                            "Request timed out after {}s. Try a smaller batch or a faster model.",
                            self.config.timeout_seconds
                        )
                    } else if e.is_connect() {
                        anyhow::anyhow!(
                            "Cannot connect to Ollama at {}. Is Ollama running?",
                            self.config.ollama_url
                        )
                    } else {
                        anyhow::anyhow!("Failed to send request: {}", e)
                    });
                }
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        if attempt > 0 {
            info!("LLM request succeeded after {} retries", attempt);
        }

        Ok(chat_response.message)
    }
}

/// Pull the JSON object out of an LLM reply.
///
/// Models wrap payloads in markdown fences or prose often enough that
/// a strict `from_str` on the raw reply is unusable; this trims to the
/// outermost object before the caller parses against its schema.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn test_extract_json_object_plain() {
        let reply = r#"{"results": []}"#;
        assert_eq!(extract_json_object(reply), Some(r#"{"results": []}"#));
    }

    #[test]
    fn test_extract_json_object_fenced() {
        let reply = "Here you go:\n```json\n{\"results\": [1, 2]}\n```\nDone.";
        assert_eq!(extract_json_object(reply), Some("{\"results\": [1, 2]}"));
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::system("hello");
        assert_eq!(msg.role, "system");
        assert!(msg.tool_calls.is_none());
        assert_eq!(ChatMessage::user("x").role, "user");
        assert_eq!(ChatMessage::tool("y").role, "tool");
    }
}
