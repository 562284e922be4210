//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.reviewlens.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Review fetcher settings.
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Chart output settings.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "review_report.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on transient failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Upper bound on tool-calling round trips per analysis.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    300
}

fn default_retries() -> usize {
    3
}

fn default_max_iterations() -> usize {
    8
}

/// Review fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Play Store host.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Review language.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Review country.
    #[serde(default = "default_country")]
    pub country: String,

    /// Fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            lang: default_lang(),
            country: default_country(),
            timeout_seconds: default_fetch_timeout(),
        }
    }
}

fn default_base_url() -> String {
    crate::fetcher::DEFAULT_BASE_URL.to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Directory where chart PNGs land.
    #[serde(default = "default_chart_dir")]
    pub output_dir: String,

    /// Prefix of the retrieval path returned for each chart.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// Canvas width in pixels.
    #[serde(default = "default_chart_width")]
    pub width: u32,

    /// Canvas height in pixels.
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: default_chart_dir(),
            public_prefix: default_public_prefix(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

fn default_chart_dir() -> String {
    "static".to_string()
}

fn default_public_prefix() -> String {
    "/static".to_string()
}

fn default_chart_width() -> u32 {
    640
}

fn default_chart_height() -> u32 {
    480
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".reviewlens.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.model.name = args.model.clone();
        self.model.ollama_url = args.ollama_url.clone();
        self.model.temperature = args.temperature;

        // Timeout - only override if explicitly provided via CLI
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        // Chart directory - always override (CLI has a default)
        self.chart.output_dir = args.chart_dir.display().to_string();

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
