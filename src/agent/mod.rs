//! LLM sub-agents for review analysis.
//!
//! Both sub-agents are declarative prompt-plus-schema components over
//! the shared Ollama chat runtime.

pub mod agent_loop;
pub mod issue_extraction;
pub mod sentiment;
pub mod tools;

pub use agent_loop::{AgentConfig, AgentRuntime};
pub use issue_extraction::IssueExtractionAgent;
pub use sentiment::{SentimentAnalysis, SentimentAnalysisAgent};
