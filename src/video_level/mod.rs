//! Video-level evaluation: how far off are the detector's per-class vehicle
//! counts for each video, and how far off are they across the chunk.

mod report;

pub use report::{
    DiffMeasure, PerformanceRow, Statistic, VideoDiffRow, VideoLevelDiff, VideoLevelPerformance,
};

use std::collections::{BTreeSet, HashSet};

use crate::error::EvalError;
use crate::index::EvaluableVideo;
use crate::ir::VideoLevelTable;

/// Compares annotated object counts with video-level detector counts.
#[derive(Debug)]
pub struct VideoLevelEvaluator<'a> {
    videos: &'a [EvaluableVideo<'a>],
    table: &'a VideoLevelTable,
    labels: Vec<String>,
}

impl<'a> VideoLevelEvaluator<'a> {
    /// The class columns are `column_order` restricted to `selected_labels`,
    /// in column order.
    pub fn new(
        videos: &'a [EvaluableVideo<'a>],
        table: &'a VideoLevelTable,
        column_order: &[String],
        selected_labels: &BTreeSet<String>,
    ) -> Result<Self, EvalError> {
        let labels = output_columns(column_order, selected_labels);
        if labels.is_empty() {
            return Err(EvalError::NoEvaluableLabels {
                column_order: column_order.to_vec(),
            });
        }
        Ok(Self {
            videos,
            table,
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the chunk summary and the per-video diff table.
    pub fn evaluate(&self) -> (VideoLevelPerformance, VideoLevelDiff) {
        let rows: Vec<VideoDiffRow> = self.videos.iter().map(|video| self.diff_row(video)).collect();

        let mut perf_rows = Vec::with_capacity(8);
        for measure in [DiffMeasure::Diff, DiffMeasure::AbsDiff] {
            let columns: Vec<SummaryStats> = (0..self.labels.len())
                .map(|col| {
                    let values: Vec<f64> = rows
                        .iter()
                        .map(|row| match measure {
                            DiffMeasure::Diff => row.diff[col] as f64,
                            DiffMeasure::AbsDiff => row.diff[col].unsigned_abs() as f64,
                        })
                        .collect();
                    SummaryStats::from_values(&values)
                })
                .collect();

            for statistic in Statistic::ALL {
                perf_rows.push(PerformanceRow {
                    measure,
                    statistic,
                    values: columns.iter().map(|s| s.get(statistic)).collect(),
                });
            }
        }

        tracing::debug!(videos = rows.len(), classes = self.labels.len(), "video-level evaluation done");

        let performance = VideoLevelPerformance {
            labels: self.labels.clone(),
            num_videos: rows.len(),
            rows: perf_rows,
        };
        let diff = VideoLevelDiff {
            labels: self.labels.clone(),
            rows,
        };
        (performance, diff)
    }

    fn diff_row(&self, video: &EvaluableVideo<'_>) -> VideoDiffRow {
        let annotated_counts = video.annotation().object_counts();

        let annotated: Vec<u64> = self
            .labels
            .iter()
            .map(|label| annotated_counts.get(label).copied().unwrap_or(0))
            .collect();
        let detected: Vec<u64> = self
            .labels
            .iter()
            .map(|label| self.table.count(&video.key, label))
            .collect();
        let diff = detected
            .iter()
            .zip(&annotated)
            .map(|(&d, &a)| signed(d).saturating_sub(signed(a)))
            .collect();

        VideoDiffRow {
            key: video.key,
            annotated,
            detected,
            diff,
        }
    }
}

fn signed(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn output_columns(column_order: &[String], selected_labels: &BTreeSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    column_order
        .iter()
        .filter(|label| selected_labels.contains(*label))
        .filter(|label| seen.insert(label.as_str()))
        .cloned()
        .collect()
}

/// Mean, sample standard deviation, min and max of a column.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SummaryStats {
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
}

impl SummaryStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() < 2 {
            f64::NAN
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        };

        Self {
            mean,
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    fn get(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Mean => self.mean,
            Statistic::Std => self.std,
            Statistic::Min => self.min,
            Statistic::Max => self.max,
        }
    }
}
