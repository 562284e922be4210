//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::chart::ChartKind;
use clap::Parser;
use std::path::PathBuf;

/// ReviewLens - LLM-powered Play Store review analyzer
///
/// Fetch recent reviews for an app, extract user-reported issues or
/// analyze sentiment with a local AI model, and render sentiment
/// charts. Markdown/JSON reports. Built in Rust.
///
/// Examples:
///   reviewlens
///   reviewlens --app "https://play.google.com/store/apps/details?id=com.example" --mode issues
///   reviewlens --app "...id=com.example" --mode sentiment --chart bar --chart line
///   reviewlens --app "...id=com.example" --dry-run
///   reviewlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Play Store URL of the app to analyze
    ///
    /// Must carry an `id=<package.name>` parameter. When omitted,
    /// ReviewLens starts an interactive session and prompts for it.
    #[arg(short, long, value_name = "URL")]
    pub app: Option<String>,

    /// Number of recent reviews to fetch (1-50)
    ///
    /// The Play Store endpoint caps a single request at 50 reviews.
    #[arg(short = 'n', long, default_value = "50", value_name = "COUNT")]
    pub count: usize,

    /// Analysis to run: issues or sentiment
    ///
    /// Required with --app; in interactive mode the session asks.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<AnalysisMode>,

    /// Ollama model to use for analysis
    ///
    /// Can also be set via REVIEWLENS_MODEL env var or .reviewlens.toml config.
    #[arg(short, long, default_value = "llama3.2:latest", env = "REVIEWLENS_MODEL")]
    pub model: String,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Output file path for the report
    #[arg(short, long, default_value = "review_report.md", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Sentiment chart(s) to render (repeatable: bar, pie, line)
    ///
    /// Only meaningful for sentiment analysis.
    #[arg(long, value_name = "KIND")]
    pub chart: Vec<ChartKind>,

    /// Directory for rendered chart files
    #[arg(long, default_value = "static", value_name = "DIR")]
    pub chart_dir: PathBuf,

    /// Also compute the aggregate sentiment summary (0-10 scale)
    #[arg(long)]
    pub aggregate: bool,

    /// Temperature for LLM responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent/deterministic output
    #[arg(long, default_value = "0.1")]
    pub temperature: f32,

    /// Request timeout in seconds
    ///
    /// How long to wait for the LLM to respond. Default: from config or 300s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .reviewlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: fetch and print reviews without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .reviewlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which sub-agent to delegate the batch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnalysisMode {
    /// Extract user-reported issues
    Issues,
    /// Analyze sentiment (and optionally render charts)
    Sentiment,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Review count is bounded by the network source
        if !(1..=crate::models::MAX_REVIEWS).contains(&self.count) {
            return Err(format!(
                "Count must be between 1 and {}",
                crate::models::MAX_REVIEWS
            ));
        }

        // Validate Ollama URL format (not needed for dry-run)
        if !self.dry_run
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Non-interactive runs need a delegation target
        if self.app.is_some() && self.mode.is_none() && !self.dry_run {
            return Err("--mode is required with --app (issues or sentiment)".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
