//! ReviewLens - LLM-powered Play Store review analyzer
//!
//! A CLI tool that fetches recent Play Store reviews for an app and
//! delegates them to Ollama-backed sub-agents: one extracts
//! user-reported issues, the other analyzes sentiment and renders
//! charts via tool-calling.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, invalid arguments, etc.)

mod agent;
mod analysis;
mod chart;
mod cli;
mod config;
mod fetcher;
mod models;
mod orchestrator;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use orchestrator::Orchestrator;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("ReviewLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .reviewlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".reviewlens.toml");

    if path.exists() {
        eprintln!("⚠️  .reviewlens.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .reviewlens.toml")?;

    println!("✅ Created .reviewlens.toml with default settings.");
    println!("   Edit it to customize model, fetcher locale, chart output, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow.
async fn run(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Handle --dry-run: fetch and print reviews, no LLM call
    if args.dry_run {
        let app_url = args
            .app
            .clone()
            .context("--dry-run requires --app <URL>")?;
        return handle_dry_run(&config, &args, &app_url).await;
    }

    let orchestrator = Orchestrator::new(config.clone(), args.clone());

    match (&args.app, args.mode) {
        // Non-interactive: both URL and mode supplied up front
        (Some(app_url), Some(mode)) => {
            if !args.quiet {
                println!("🤖 Model: {} @ {}", config.model.name, config.model.ollama_url);
            }
            orchestrator.run_once(app_url, mode).await
        }
        // Interactive session
        _ => orchestrator.run_interactive().await,
    }
}

/// Handle --dry-run: fetch the batch and print it, then exit.
async fn handle_dry_run(config: &Config, args: &Args, app_url: &str) -> Result<()> {
    println!("\n🔍 Dry run: fetching reviews (no LLM call)...\n");

    let orchestrator = Orchestrator::new(config.clone(), args.clone());
    let batch = orchestrator.fetch(app_url).await;

    if let Some(failure) = batch.failure() {
        println!("   ⚠️  {}", failure.message);
    } else if batch.is_empty() {
        println!("   No reviews found.");
    } else {
        println!("   Fetched {} review(s):\n", batch.len());
        for record in batch.records() {
            println!(
                "     ⭐ {} | {} | {}",
                record.score,
                record.date,
                record.text.replace('\n', " ")
            );
        }
    }

    println!("\n✅ Dry run complete. No LLM calls were made.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .reviewlens.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
