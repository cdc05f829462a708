//! Video-level report types and text formatting.

use serde::Serialize;
use std::fmt;

use crate::ir::VideoKey;

/// Which per-video difference a statistic summarizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMeasure {
    /// `detected - annotated`
    Diff,
    /// `|detected - annotated|`
    AbsDiff,
}

/// Aggregate statistic over the videos of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    /// Sample standard deviation (n - 1); NaN for a single video.
    Std,
    Min,
    Max,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Mean,
        Statistic::Std,
        Statistic::Min,
        Statistic::Max,
    ];
}

impl fmt::Display for DiffMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffMeasure::Diff => write!(f, "diff"),
            DiffMeasure::AbsDiff => write!(f, "abs_diff"),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Std => write!(f, "std"),
            Statistic::Min => write!(f, "min"),
            Statistic::Max => write!(f, "max"),
        }
    }
}

/// One row of the performance summary: one statistic of one measure,
/// with a value per class column.
#[derive(Clone, Debug, Serialize)]
pub struct PerformanceRow {
    pub measure: DiffMeasure,
    pub statistic: Statistic,
    pub values: Vec<f64>,
}

/// Count-error summary over a chunk: one row per statistic, one column per class.
#[derive(Clone, Debug, Serialize)]
pub struct VideoLevelPerformance {
    /// Class columns, in the caller's column order.
    pub labels: Vec<String>,
    /// Number of videos aggregated.
    pub num_videos: usize,
    pub rows: Vec<PerformanceRow>,
}

impl VideoLevelPerformance {
    /// Looks up one cell of the summary.
    pub fn value(&self, measure: DiffMeasure, statistic: Statistic, label: &str) -> Option<f64> {
        let col = self.labels.iter().position(|l| l == label)?;
        self.rows
            .iter()
            .find(|r| r.measure == measure && r.statistic == statistic)
            .and_then(|r| r.values.get(col).copied())
    }
}

/// Annotated and detected counts, and their difference, for one video.
#[derive(Clone, Debug, Serialize)]
pub struct VideoDiffRow {
    pub key: VideoKey,
    pub annotated: Vec<u64>,
    pub detected: Vec<u64>,
    /// `detected - annotated`, per class column.
    pub diff: Vec<i64>,
}

/// Per-video signed count differences: one row per video, one column per class.
#[derive(Clone, Debug, Serialize)]
pub struct VideoLevelDiff {
    pub labels: Vec<String>,
    pub rows: Vec<VideoDiffRow>,
}

impl VideoLevelDiff {
    /// Signed difference for one video and class.
    pub fn diff(&self, key: &VideoKey, label: &str) -> Option<i64> {
        let col = self.labels.iter().position(|l| l == label)?;
        self.rows
            .iter()
            .find(|r| &r.key == key)
            .and_then(|r| r.diff.get(col).copied())
    }
}

const COLUMN_WIDTH: usize = 10;

fn write_header(f: &mut fmt::Formatter<'_>, first: &str, width: usize, labels: &[String]) -> fmt::Result {
    write!(f, "  {first:<width$}")?;
    for label in labels {
        write!(f, " {label:>COLUMN_WIDTH$}")?;
    }
    writeln!(f)
}

impl fmt::Display for VideoLevelPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Video-level performance ({} video(s))", self.num_videos)?;
        write_header(f, "statistic", 14, &self.labels)?;
        for row in &self.rows {
            let name = format!("{}_{}", row.statistic, row.measure);
            write!(f, "  {name:<14}")?;
            for value in &row.values {
                if value.is_nan() {
                    write!(f, " {:>COLUMN_WIDTH$}", "NaN")?;
                } else {
                    write!(f, " {value:>COLUMN_WIDTH$.3}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for VideoLevelDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Per-video count diff (detected - annotated)")?;
        write_header(f, "video", 34, &self.labels)?;
        for row in &self.rows {
            write!(f, "  {:<34}", row.key.to_string())?;
            for value in &row.diff {
                write!(f, " {value:>COLUMN_WIDTH$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
