//! Markdown and JSON report generation.
//!
//! Renders the outcome of an analysis run (extracted issues or
//! sentiment results) into a report file for the operator.

use crate::analysis::{sort_by_priority, tag_counts};
use crate::models::{
    FetchFailure, IssueReport, Priority, SentimentReport, SentimentSummary,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Store URL the operator supplied.
    pub app_url: String,
    /// Extracted package id, if the URL was well-formed.
    pub app_id: Option<String>,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the LLM model used.
    pub model_used: String,
    /// Number of reviews in the analyzed batch.
    pub reviews_analyzed: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The analysis outcome carried by a report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Issues {
        results: Vec<IssueReport>,
    },
    Sentiment {
        results: Vec<SentimentReport>,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<SentimentSummary>,
        /// Chart retrieval paths, verbatim.
        charts: Vec<String>,
    },
}

/// A complete analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Present when the fetch step degraded to the error sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<FetchFailure>,
    pub outcome: AnalysisOutcome,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# ReviewLens Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(ref failure) = report.fetch_error {
        output.push_str("## Fetch Error\n\n");
        output.push_str(&format!(
            "> ⚠️ Review fetch failed: {}\n\n",
            failure.message
        ));
    }

    match &report.outcome {
        AnalysisOutcome::Issues { results } => {
            output.push_str(&generate_issues_section(results));
        }
        AnalysisOutcome::Sentiment {
            results,
            summary,
            charts,
        } => {
            output.push_str(&generate_sentiment_section(results));
            if let Some(summary) = summary {
                output.push_str(&generate_summary_section(summary));
            }
            output.push_str(&generate_charts_section(charts));
        }
    }

    output.push_str(&generate_footer());
    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **App URL:** {}\n", metadata.app_url));
    if let Some(ref app_id) = metadata.app_id {
        section.push_str(&format!("- **App ID:** `{}`\n", app_id));
    }
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Reviews Analyzed:** {}\n",
        metadata.reviews_analyzed
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_issues_section(issues: &[IssueReport]) -> String {
    let mut section = String::new();

    section.push_str("## Extracted Issues\n\n");

    if issues.is_empty() {
        section.push_str("No issues were extracted from the reviews. 🎉\n\n");
        return section;
    }

    let mut sorted = issues.to_vec();
    sort_by_priority(&mut sorted);

    section.push_str("| Priority | Tag | Issue |\n");
    section.push_str("|:---:|:---|:---|\n");
    for issue in &sorted {
        section.push_str(&format!(
            "| {} {} | {} | {} |\n",
            issue.priority.emoji(),
            issue.priority,
            issue.tag,
            issue.issue.replace('|', "\\|")
        ));
    }
    section.push('\n');

    let counts = tag_counts(issues);
    if !counts.is_empty() {
        section.push_str("### Issues by Tag\n\n");
        section.push_str("| Tag | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut tags: Vec<_> = counts.iter().collect();
        tags.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

        for (tag, count) in tags {
            section.push_str(&format!("| {} | {} |\n", tag, count));
        }
        section.push('\n');
    }

    let high = sorted
        .iter()
        .filter(|i| i.priority == Priority::High)
        .count();
    if high > 0 {
        section.push_str(&format!(
            "> 🔴 {} high-priority issue(s) — address these first.\n\n",
            high
        ));
    }

    section
}

fn generate_sentiment_section(results: &[SentimentReport]) -> String {
    let mut section = String::new();

    section.push_str("## Sentiment Analysis\n\n");

    if results.is_empty() {
        section.push_str("No reviews were analyzed.\n\n");
        return section;
    }

    section.push_str("| Date | Score | Sentiment | Confidence | Frustrated | Sarcastic | Review |\n");
    section.push_str("|:---|:---:|:---|:---:|:---:|:---:|:---|\n");
    for result in results {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} | {} | {} | {} |\n",
            result.date,
            result.score,
            result.sentiment,
            result.confidence,
            if result.frustrated { "yes" } else { "no" },
            if result.sarcastic { "yes" } else { "no" },
            truncate(&result.text, 80).replace('|', "\\|")
        ));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &SentimentSummary) -> String {
    let mut section = String::new();

    section.push_str("## Aggregate Summary\n\n");
    section.push_str(&format!(
        "- **Sentiment Scale:** {:.1} / 10\n",
        summary.sentiment_scale
    ));
    section.push_str(&format!(
        "- **Counts:** 🟢 positive: {} | ⚪ neutral: {} | 🔴 negative: {}\n\n",
        summary.sentiment_count[0], summary.sentiment_count[1], summary.sentiment_count[2]
    ));

    section
}

fn generate_charts_section(charts: &[String]) -> String {
    if charts.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Charts\n\n");
    for path in charts {
        section.push_str(&format!("- `{}`\n", path));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by ReviewLens*\n".to_string()
}

/// Truncate review text for table cells, on a char boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueTag, Sentiment, Source};

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            app_url: "https://play.google.com/store/apps/details?id=com.example".to_string(),
            app_id: Some("com.example".to_string()),
            analysis_date: Utc::now(),
            model_used: "test-model".to_string(),
            reviews_analyzed: 2,
            duration_seconds: 4.2,
        }
    }

    fn sentiment_report(sentiment: Sentiment, text: &str) -> SentimentReport {
        SentimentReport {
            source: Source::Playstore,
            text: text.to_string(),
            score: 3,
            date: "2024-06-01".parse().unwrap(),
            sentiment,
            confidence: 0.9,
            frustrated: false,
            sarcastic: false,
        }
    }

    #[test]
    fn test_markdown_issue_report() {
        let report = Report {
            metadata: metadata(),
            fetch_error: None,
            outcome: AnalysisOutcome::Issues {
                results: vec![
                    IssueReport {
                        issue: "App crashes on launch".to_string(),
                        tag: IssueTag::Crash,
                        priority: Priority::High,
                    },
                    IssueReport {
                        issue: "Settings menu hard to find".to_string(),
                        tag: IssueTag::Ui,
                        priority: Priority::Low,
                    },
                ],
            },
        };

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("# ReviewLens Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Extracted Issues"));
        assert!(markdown.contains("App crashes on launch"));
        assert!(markdown.contains("high-priority issue"));

        // High priority sorts above low.
        let crash = markdown.find("App crashes on launch").unwrap();
        let ui = markdown.find("Settings menu hard to find").unwrap();
        assert!(crash < ui);
    }

    #[test]
    fn test_markdown_sentiment_report_with_charts() {
        let report = Report {
            metadata: metadata(),
            fetch_error: None,
            outcome: AnalysisOutcome::Sentiment {
                results: vec![
                    sentiment_report(Sentiment::Positive, "Love it"),
                    sentiment_report(Sentiment::Negative, "Hate it"),
                ],
                summary: Some(SentimentSummary {
                    sentiment_scale: 5.0,
                    sentiment_count: [1, 0, 1],
                }),
                charts: vec!["/static/sentiment_bar_20240601120000.png".to_string()],
            },
        };

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("## Sentiment Analysis"));
        assert!(markdown.contains("## Aggregate Summary"));
        assert!(markdown.contains("5.0 / 10"));
        assert!(markdown.contains("/static/sentiment_bar_20240601120000.png"));
    }

    #[test]
    fn test_markdown_fetch_error_section() {
        let report = Report {
            metadata: metadata(),
            fetch_error: Some(FetchFailure::new("Failed to fetch reviews: no app id")),
            outcome: AnalysisOutcome::Issues { results: vec![] },
        };

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("## Fetch Error"));
        assert!(markdown.contains("no app id"));
    }

    #[test]
    fn test_json_report() {
        let report = Report {
            metadata: metadata(),
            fetch_error: None,
            outcome: AnalysisOutcome::Sentiment {
                results: vec![sentiment_report(Sentiment::Neutral, "ok")],
                summary: None,
                charts: vec![],
            },
        };

        let json = generate_json_report(&report).unwrap();
        assert!(json.contains("\"mode\": \"sentiment\""));
        assert!(json.contains("\"app_id\""));
        assert!(json.contains("\"results\""));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 80), "short");
        let long = "é".repeat(100);
        let cut = truncate(&long, 10);
        assert!(cut.chars().count() <= 11);
    }
}
