//! Sentiment and issue aggregation.
//!
//! Pure helpers shared by the aggregate output mode, the chart
//! renderer, and the report generator.

use crate::models::{IssueReport, IssueTag, Sentiment, SentimentReport, SentimentSummary};
use std::collections::HashMap;

/// Count sentiment labels as `[positive, neutral, negative]`.
pub fn count_labels(labels: &[Sentiment]) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for label in labels {
        counts[label.index()] += 1;
    }
    counts
}

/// Sentiment labels of a result set, in order.
pub fn sentiment_labels(reports: &[SentimentReport]) -> Vec<Sentiment> {
    reports.iter().map(|r| r.sentiment).collect()
}

/// Aggregate sentiment summary: category counts plus the weighted mean
/// on a 0-10 scale (positive=10, neutral=5, negative=0).
///
/// An empty input yields scale 0.0 and zero counts.
pub fn summarize_sentiments(reports: &[SentimentReport]) -> SentimentSummary {
    let labels = sentiment_labels(reports);
    let sentiment_count = count_labels(&labels);

    let sentiment_scale = if labels.is_empty() {
        0.0
    } else {
        labels.iter().map(|l| l.weight()).sum::<f64>() / labels.len() as f64
    };

    SentimentSummary {
        sentiment_scale,
        sentiment_count,
    }
}

/// Sort issues in place by priority, high first.
pub fn sort_by_priority(issues: &mut [IssueReport]) {
    issues.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Issue counts per tag.
pub fn tag_counts(issues: &[IssueReport]) -> HashMap<IssueTag, usize> {
    let mut counts: HashMap<IssueTag, usize> = HashMap::new();

    for issue in issues {
        *counts.entry(issue.tag).or_default() += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Source};

    fn sentiment_report(sentiment: Sentiment) -> SentimentReport {
        SentimentReport {
            source: Source::Playstore,
            text: "test".to_string(),
            score: 3,
            date: "2024-06-01".parse().unwrap(),
            sentiment,
            confidence: 0.9,
            frustrated: false,
            sarcastic: false,
        }
    }

    fn issue(tag: IssueTag, priority: Priority) -> IssueReport {
        IssueReport {
            issue: "test issue".to_string(),
            tag,
            priority,
        }
    }

    #[test]
    fn test_all_positive_scale_is_ten() {
        for n in [1, 7, 50] {
            let reports: Vec<_> = (0..n).map(|_| sentiment_report(Sentiment::Positive)).collect();
            let summary = summarize_sentiments(&reports);
            assert_eq!(summary.sentiment_scale, 10.0);
            assert_eq!(summary.sentiment_count, [n, 0, 0]);
        }
    }

    #[test]
    fn test_all_negative_scale_is_zero() {
        let reports: Vec<_> = (0..5).map(|_| sentiment_report(Sentiment::Negative)).collect();
        let summary = summarize_sentiments(&reports);
        assert_eq!(summary.sentiment_scale, 0.0);
        assert_eq!(summary.sentiment_count, [0, 0, 5]);
    }

    #[test]
    fn test_mixed_scale_is_weighted_mean() {
        let reports = vec![
            sentiment_report(Sentiment::Positive),
            sentiment_report(Sentiment::Neutral),
            sentiment_report(Sentiment::Negative),
            sentiment_report(Sentiment::Positive),
        ];
        // (10 + 5 + 0 + 10) / 4 = 6.25
        let summary = summarize_sentiments(&reports);
        assert_eq!(summary.sentiment_scale, 6.25);
        assert_eq!(summary.sentiment_count, [2, 1, 1]);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize_sentiments(&[]);
        assert_eq!(summary.sentiment_scale, 0.0);
        assert_eq!(summary.sentiment_count, [0, 0, 0]);
    }

    #[test]
    fn test_sort_by_priority() {
        let mut issues = vec![
            issue(IssueTag::Ui, Priority::Low),
            issue(IssueTag::Crash, Priority::High),
            issue(IssueTag::Bug, Priority::Medium),
        ];

        sort_by_priority(&mut issues);

        assert_eq!(issues[0].priority, Priority::High);
        assert_eq!(issues[1].priority, Priority::Medium);
        assert_eq!(issues[2].priority, Priority::Low);
    }

    #[test]
    fn test_tag_counts() {
        let issues = vec![
            issue(IssueTag::Performance, Priority::Medium),
            issue(IssueTag::Performance, Priority::Low),
            issue(IssueTag::FeatureRequest, Priority::Low),
        ];

        let counts = tag_counts(&issues);
        assert_eq!(counts.get(&IssueTag::Performance), Some(&2));
        assert_eq!(counts.get(&IssueTag::FeatureRequest), Some(&1));
    }
}
