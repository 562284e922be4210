//! Sentiment chart rendering.
//!
//! Three chart operations (bar, pie, line) over the fixed
//! positive/neutral/negative domain. Each renders a PNG under the
//! configured output directory and returns a root-relative retrieval
//! path alongside the file path.
//!
//! Filenames carry a second-granularity timestamp; two renders within
//! the same second race on the filename. Known limitation, kept as-is.

use crate::analysis::count_labels;
use crate::models::{ChartArtifact, Sentiment};
use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Which chart to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Pie => write!(f, "pie"),
            ChartKind::Line => write!(f, "line"),
        }
    }
}

/// Fixed category colors: green / gray / red.
fn sentiment_color(sentiment: Sentiment) -> RGBColor {
    match sentiment {
        Sentiment::Positive => RGBColor(34, 139, 34),
        Sentiment::Neutral => RGBColor(128, 128, 128),
        Sentiment::Negative => RGBColor(200, 30, 30),
    }
}

/// Bucket sentiment labels per distinct date, positive/neutral/negative.
pub fn bucket_by_date(
    labels: &[Sentiment],
    dates: &[NaiveDate],
) -> BTreeMap<NaiveDate, [usize; 3]> {
    let mut buckets: BTreeMap<NaiveDate, [usize; 3]> = BTreeMap::new();
    for (label, date) in labels.iter().zip(dates.iter()) {
        buckets.entry(*date).or_insert([0; 3])[label.index()] += 1;
    }
    buckets
}

fn chart_err<E: fmt::Display>(e: E) -> anyhow::Error {
    anyhow::anyhow!("chart rendering failed: {}", e)
}

/// Renders sentiment charts into a static-serving directory.
#[derive(Debug, Clone)]
pub struct SentimentChartRenderer {
    /// Directory where PNG files land; created on demand.
    pub output_dir: PathBuf,
    /// Prefix for the returned retrieval path, e.g. `/static`.
    pub public_prefix: String,
    /// Canvas size in pixels.
    pub width: u32,
    pub height: u32,
}

impl SentimentChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            public_prefix: public_prefix.into(),
            width: 640,
            height: 480,
        }
    }

    /// Dispatch on chart kind. Line charts need the parallel date list.
    pub fn render(
        &self,
        kind: ChartKind,
        labels: &[Sentiment],
        dates: &[NaiveDate],
    ) -> Result<ChartArtifact> {
        match kind {
            ChartKind::Bar => self.render_bar(labels),
            ChartKind::Pie => self.render_pie(labels),
            ChartKind::Line => self.render_line(labels, dates),
        }
    }

    /// Bar chart of counts per sentiment category.
    pub fn render_bar(&self, labels: &[Sentiment]) -> Result<ChartArtifact> {
        if labels.is_empty() {
            bail!("no sentiment data to plot");
        }

        let counts = count_labels(labels);
        let max = counts.iter().copied().max().unwrap_or(0).max(1);
        let (path, public_path) = self.artifact_path(ChartKind::Bar)?;

        {
            let root = BitMapBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Sentiment Distribution", ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(36)
                .y_label_area_size(48)
                .build_cartesian_2d((0usize..2usize).into_segmented(), 0usize..max + 1)
                .map_err(chart_err)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(3)
                .x_label_formatter(&|seg| match seg {
                    SegmentValue::CenterOf(i) if *i < 3 => Sentiment::ALL[*i].to_string(),
                    _ => String::new(),
                })
                .y_desc("Number of Reviews")
                .draw()
                .map_err(chart_err)?;

            for (i, sentiment) in Sentiment::ALL.iter().enumerate() {
                chart
                    .draw_series(
                        Histogram::vertical(&chart)
                            .style(sentiment_color(*sentiment).filled())
                            .margin(24)
                            .data(std::iter::once((i, counts[i]))),
                    )
                    .map_err(chart_err)?;
            }

            root.present().map_err(chart_err)?;
        }

        info!("Rendered bar chart: {}", public_path);
        Ok(ChartArtifact {
            file_path: path,
            public_path,
        })
    }

    /// Pie chart of the sentiment distribution. Zero-count categories
    /// are omitted, matching the label set to the slices.
    pub fn render_pie(&self, labels: &[Sentiment]) -> Result<ChartArtifact> {
        if labels.is_empty() {
            bail!("no sentiment data to plot");
        }

        let counts = count_labels(labels);
        let mut sizes = Vec::new();
        let mut colors = Vec::new();
        let mut slice_labels = Vec::new();
        for sentiment in Sentiment::ALL {
            let count = counts[sentiment.index()];
            if count > 0 {
                sizes.push(count as f64);
                colors.push(sentiment_color(sentiment));
                slice_labels.push(sentiment.to_string());
            }
        }

        let (path, public_path) = self.artifact_path(ChartKind::Pie)?;

        {
            let root = BitMapBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_err)?;
            let root = root
                .titled("Sentiment Distribution - Pie Chart", ("sans-serif", 28))
                .map_err(chart_err)?;

            let (w, h) = root.dim_in_pixel();
            let center = ((w / 2) as i32, (h / 2) as i32);
            let radius = f64::from(w.min(h)) * 0.35;

            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &slice_labels);
            pie.label_style(("sans-serif", 18).into_font());
            pie.percentages(("sans-serif", 14).into_font());
            root.draw(&pie).map_err(chart_err)?;

            root.present().map_err(chart_err)?;
        }

        info!("Rendered pie chart: {}", public_path);
        Ok(ChartArtifact {
            file_path: path,
            public_path,
        })
    }

    /// Line chart of per-date counts, one series per category, dates
    /// iterated in sorted order.
    pub fn render_line(&self, labels: &[Sentiment], dates: &[NaiveDate]) -> Result<ChartArtifact> {
        if labels.is_empty() {
            bail!("no sentiment data to plot");
        }
        if labels.len() != dates.len() {
            bail!(
                "sentiment and date lists must be parallel ({} vs {})",
                labels.len(),
                dates.len()
            );
        }

        let buckets = bucket_by_date(labels, dates);
        let start = *buckets.keys().next().unwrap();
        let mut end = *buckets.keys().next_back().unwrap();
        if start == end {
            // Widen a degenerate axis; the plotted points keep the real date.
            end = end + chrono::Duration::days(1);
        }
        let max = buckets
            .values()
            .flat_map(|c| c.iter().copied())
            .max()
            .unwrap_or(0)
            .max(1);

        let (path, public_path) = self.artifact_path(ChartKind::Line)?;

        {
            let root = BitMapBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Sentiment Over Time", ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(44)
                .y_label_area_size(48)
                .build_cartesian_2d(start..end, 0usize..max + 1)
                .map_err(chart_err)?;

            chart
                .configure_mesh()
                .x_label_formatter(&|d| d.format("%Y-%m-%d").to_string())
                .x_desc("Date")
                .y_desc("Number of Reviews")
                .draw()
                .map_err(chart_err)?;

            for sentiment in Sentiment::ALL {
                let color = sentiment_color(sentiment);
                let points: Vec<(NaiveDate, usize)> = buckets
                    .iter()
                    .map(|(date, counts)| (*date, counts[sentiment.index()]))
                    .collect();

                chart
                    .draw_series(LineSeries::new(
                        points.iter().copied(),
                        color.stroke_width(2),
                    ))
                    .map_err(chart_err)?
                    .label(sentiment.to_string())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });

                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|(d, c)| Circle::new((*d, *c), 3, color.filled())),
                    )
                    .map_err(chart_err)?;
            }

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(chart_err)?;

            root.present().map_err(chart_err)?;
        }

        info!("Rendered line chart: {}", public_path);
        Ok(ChartArtifact {
            file_path: path,
            public_path,
        })
    }

    /// Timestamped file path plus its public retrieval path.
    fn artifact_path(&self, kind: ChartKind) -> Result<(PathBuf, String)> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create chart output directory: {}",
                self.output_dir.display()
            )
        })?;

        let filename = format!(
            "sentiment_{}_{}.png",
            kind,
            Local::now().format("%Y%m%d%H%M%S")
        );
        let public_path = format!("{}/{}", self.public_prefix, filename);
        Ok((self.output_dir.join(filename), public_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn renderer(dir: &TempDir) -> SentimentChartRenderer {
        SentimentChartRenderer::new(dir.path(), "/static")
    }

    fn mixed_labels() -> Vec<Sentiment> {
        vec![Sentiment::Positive, Sentiment::Positive, Sentiment::Negative]
    }

    #[test]
    fn test_count_labels_sum() {
        let counts = count_labels(&mixed_labels());
        assert_eq!(counts, [2, 0, 1]);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_render_bar_creates_file() {
        let dir = TempDir::new().unwrap();
        let artifact = renderer(&dir).render_bar(&mixed_labels()).unwrap();

        assert!(artifact.file_path.exists());
        assert!(artifact.public_path.starts_with("/static/sentiment_bar_"));
        assert!(artifact.public_path.ends_with(".png"));
    }

    #[test]
    fn test_render_pie_creates_file() {
        let dir = TempDir::new().unwrap();
        let artifact = renderer(&dir).render_pie(&mixed_labels()).unwrap();

        assert!(artifact.file_path.exists());
        assert!(artifact.public_path.starts_with("/static/sentiment_pie_"));
    }

    #[test]
    fn test_render_line_creates_file() {
        let dir = TempDir::new().unwrap();
        let labels = vec![Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];
        let dates: Vec<NaiveDate> = vec![
            "2024-06-01".parse().unwrap(),
            "2024-06-01".parse().unwrap(),
            "2024-06-02".parse().unwrap(),
        ];
        let artifact = renderer(&dir).render_line(&labels, &dates).unwrap();

        assert!(artifact.file_path.exists());
        assert!(artifact.public_path.starts_with("/static/sentiment_line_"));
    }

    #[test]
    fn test_bucket_by_date_same_day_counts_independently() {
        let labels = vec![Sentiment::Positive, Sentiment::Negative];
        let date: NaiveDate = "2024-06-01".parse().unwrap();
        let buckets = bucket_by_date(&labels, &[date, date]);

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[&date], [1, 0, 1]);
    }

    #[test]
    fn test_bucket_by_date_sorted_iteration() {
        let labels = vec![Sentiment::Positive, Sentiment::Positive];
        let d1: NaiveDate = "2024-06-02".parse().unwrap();
        let d2: NaiveDate = "2024-05-30".parse().unwrap();
        let buckets = bucket_by_date(&labels, &[d1, d2]);

        let keys: Vec<_> = buckets.keys().copied().collect();
        assert_eq!(keys, vec![d2, d1]);
    }

    #[test]
    fn test_repeated_render_returns_wellformed_artifacts() {
        // Same-second filename collision is a known limitation, so only
        // the artifact shape and file presence are asserted here.
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let first = r.render_bar(&mixed_labels()).unwrap();
        let second = r.render_bar(&mixed_labels()).unwrap();

        assert!(first.file_path.exists());
        assert!(second.file_path.exists());
        assert!(second.public_path.starts_with("/static/sentiment_bar_"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(renderer(&dir).render_bar(&[]).is_err());
        assert!(renderer(&dir).render_line(&[], &[]).is_err());
    }

    #[test]
    fn test_line_rejects_mismatched_lengths() {
        let dir = TempDir::new().unwrap();
        let date: NaiveDate = "2024-06-01".parse().unwrap();
        let result = renderer(&dir).render_line(&[Sentiment::Positive], &[date, date]);
        assert!(result.is_err());
    }
}
