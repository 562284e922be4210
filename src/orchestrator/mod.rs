//! Root orchestrator.
//!
//! Drives the session: collect a Play Store URL, fetch the review
//! batch, ask which analysis to run, delegate the batch to the chosen
//! sub-agent, and write the report. The interactive loop keeps going
//! until the operator exits; `run_once` is the single-shot path used
//! when `--app` and `--mode` come from the command line.

use crate::agent::{AgentConfig, IssueExtractionAgent, SentimentAnalysisAgent};
use crate::agent::tools::ChartToolExecutor;
use crate::chart::{ChartKind, SentimentChartRenderer};
use crate::cli::{AnalysisMode, Args, OutputFormat};
use crate::config::Config;
use crate::fetcher::{extract_app_id, FetcherSettings, ReviewFetcher};
use crate::models::ReviewBatch;
use crate::report::{
    generate_json_report, generate_markdown_report, AnalysisOutcome, Report, ReportMetadata,
};
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::time::{Duration, Instant};
use tracing::info;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the operator to supply a store URL.
    AwaitingAppInput,
    /// A batch is in hand; waiting for the analysis choice.
    ReviewsFetched,
    /// The batch has been handed to a sub-agent.
    Delegated,
}

/// Map an analysis-choice reply to a mode.
///
/// Accepts the menu number or the mode name, case-insensitive.
pub fn parse_choice(input: &str) -> Option<AnalysisMode> {
    match input.trim().to_lowercase().as_str() {
        "1" | "issues" | "issue" => Some(AnalysisMode::Issues),
        "2" | "sentiment" => Some(AnalysisMode::Sentiment),
        _ => None,
    }
}

/// The root orchestrator.
pub struct Orchestrator {
    config: Config,
    args: Args,
}

impl Orchestrator {
    pub fn new(config: Config, args: Args) -> Self {
        Self { config, args }
    }

    fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            ollama_url: self.config.model.ollama_url.clone(),
            model_name: self.config.model.name.clone(),
            temperature: self.config.model.temperature,
            timeout_seconds: self.config.model.timeout_seconds,
            retries: self.config.model.retries,
            max_iterations: self.config.model.max_iterations,
        }
    }

    fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            base_url: self.config.fetcher.base_url.clone(),
            lang: self.config.fetcher.lang.clone(),
            country: self.config.fetcher.country.clone(),
            timeout_seconds: self.config.fetcher.timeout_seconds,
        }
    }

    fn chart_executor(&self) -> ChartToolExecutor {
        let mut renderer = SentimentChartRenderer::new(
            self.config.chart.output_dir.clone(),
            self.config.chart.public_prefix.clone(),
        );
        renderer.width = self.config.chart.width;
        renderer.height = self.config.chart.height;
        ChartToolExecutor::new(renderer)
    }

    /// Fetch the review batch for a store URL, with a spinner.
    pub async fn fetch(&self, app_url: &str) -> ReviewBatch {
        let spinner = self.spinner("Fetching reviews...");
        let fetcher = ReviewFetcher::new(self.fetcher_settings());
        let batch = fetcher.fetch_batch(app_url, self.args.count).await;
        spinner.finish_and_clear();
        batch
    }

    /// Run one fetch-delegate-report cycle and write the report file.
    pub async fn run_once(&self, app_url: &str, mode: AnalysisMode) -> Result<()> {
        let start = Instant::now();
        let batch = self.fetch(app_url).await;
        self.delegate(app_url, &batch, mode, start).await
    }

    /// Delegate a fetched batch to the chosen sub-agent and report.
    async fn delegate(
        &self,
        app_url: &str,
        batch: &ReviewBatch,
        mode: AnalysisMode,
        start: Instant,
    ) -> Result<()> {
        let spinner = self.spinner(match mode {
            AnalysisMode::Issues => "Extracting issues...",
            AnalysisMode::Sentiment => "Analyzing sentiment...",
        });

        let outcome = match mode {
            AnalysisMode::Issues => {
                let agent = IssueExtractionAgent::new(self.agent_config());
                let results = agent.extract(batch).await;
                spinner.finish_and_clear();
                AnalysisOutcome::Issues { results: results? }
            }
            AnalysisMode::Sentiment => {
                let mut agent =
                    SentimentAnalysisAgent::new(self.agent_config(), self.chart_executor());
                let analysis = agent.analyze(batch, &self.args.chart, self.args.aggregate).await;
                spinner.finish_and_clear();
                let analysis = analysis?;
                AnalysisOutcome::Sentiment {
                    results: analysis.results,
                    summary: analysis.summary,
                    charts: analysis
                        .charts
                        .iter()
                        .map(|c| c.public_path.clone())
                        .collect(),
                }
            }
        };

        let report = Report {
            metadata: ReportMetadata {
                app_url: app_url.to_string(),
                app_id: extract_app_id(app_url),
                analysis_date: Utc::now(),
                model_used: self.config.model.name.clone(),
                reviews_analyzed: batch.records().len(),
                duration_seconds: start.elapsed().as_secs_f64(),
            },
            fetch_error: batch.failure().cloned(),
            outcome,
        };

        self.write_report(&report)?;
        self.print_summary(&report);
        Ok(())
    }

    fn write_report(&self, report: &Report) -> Result<()> {
        let content = match self.args.format {
            OutputFormat::Markdown => generate_markdown_report(report),
            OutputFormat::Json => generate_json_report(report)?,
        };

        std::fs::write(&self.args.output, content).with_context(|| {
            format!("Failed to write report to {}", self.args.output.display())
        })?;

        info!("Report written to {}", self.args.output.display());
        Ok(())
    }

    fn print_summary(&self, report: &Report) {
        if self.args.quiet {
            return;
        }

        println!();
        match &report.outcome {
            AnalysisOutcome::Issues { results } => {
                println!("✅ Extracted {} issue(s)", results.len());
            }
            AnalysisOutcome::Sentiment {
                results,
                summary,
                charts,
            } => {
                println!("✅ Analyzed sentiment of {} review(s)", results.len());
                if let Some(summary) = summary {
                    println!("📊 Sentiment scale: {:.1} / 10", summary.sentiment_scale);
                }
                for chart in charts {
                    println!("🖼️  Chart: {}", chart);
                }
            }
        }
        if let Some(ref failure) = report.fetch_error {
            println!("⚠️  {}", failure.message);
        }
        println!("📄 Report: {}", self.args.output.display());
    }

    /// Interactive session: prompt for a URL, fetch, ask for the
    /// analysis, delegate. Repeats until the operator exits.
    pub async fn run_interactive(&self) -> Result<()> {
        let mut editor = DefaultEditor::new().context("Failed to initialize input editor")?;

        println!("ReviewLens interactive session. Type 'exit' to quit.\n");

        loop {
            let mut state = SessionState::AwaitingAppInput;
            info!("Session state: {:?}", state);

            let app_url = match self.read_line(&mut editor, "Play Store URL> ")? {
                Some(line) if !line.trim().is_empty() => line.trim().to_string(),
                Some(_) => continue,
                None => break,
            };

            let start = Instant::now();
            let batch = self.fetch(&app_url).await;
            state = SessionState::ReviewsFetched;
            info!("Session state: {:?}", state);

            match batch.failure() {
                Some(failure) => println!("⚠️  {}", failure.message),
                None => println!("Fetched {} review(s).", batch.len()),
            }

            let mode = loop {
                let choice = match self.read_line(
                    &mut editor,
                    "Analysis: [1] issues  [2] sentiment> ",
                )? {
                    Some(line) => line,
                    None => return Ok(()),
                };
                if matches!(choice.trim(), "exit" | "quit") {
                    return Ok(());
                }
                match parse_choice(&choice) {
                    Some(mode) => break mode,
                    None => println!("Please answer 1 (issues) or 2 (sentiment)."),
                }
            };

            self.delegate(&app_url, &batch, mode, start).await?;
            state = SessionState::Delegated;
            info!("Session state: {:?}", state);
            println!();
        }

        Ok(())
    }

    /// Read one line; `None` means the operator ended the session.
    fn read_line(&self, editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
        match editor.readline(prompt) {
            Ok(line) => {
                if matches!(line.trim(), "exit" | "quit") {
                    Ok(None)
                } else {
                    let _ = editor.add_history_entry(&line);
                    Ok(Some(line))
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e).context("Failed to read input"),
        }
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        if self.args.quiet {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice_numbers() {
        assert_eq!(parse_choice("1"), Some(AnalysisMode::Issues));
        assert_eq!(parse_choice("2"), Some(AnalysisMode::Sentiment));
    }

    #[test]
    fn test_parse_choice_names() {
        assert_eq!(parse_choice("issues"), Some(AnalysisMode::Issues));
        assert_eq!(parse_choice(" Sentiment "), Some(AnalysisMode::Sentiment));
    }

    #[test]
    fn test_parse_choice_rejects_garbage() {
        assert_eq!(parse_choice("3"), None);
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("both"), None);
    }
}
