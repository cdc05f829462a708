//! Frame-level report types and text formatting.

use serde::Serialize;
use std::fmt;

/// Matching totals and average precision for one class.
#[derive(Clone, Debug, Serialize)]
pub struct ClassAveragePrecision {
    pub label: String,
    /// Absent when the class has no ground truth in the chunk.
    pub average_precision: Option<f64>,
    pub ground_truths: usize,
    pub detections: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Per-class AP and the chunk's mean average precision.
#[derive(Clone, Debug, Serialize)]
pub struct FrameLevelReport {
    pub iou_threshold: f64,
    pub num_videos: usize,
    /// One entry per selected label, sorted by label.
    pub classes: Vec<ClassAveragePrecision>,
    /// Mean over classes that have ground truth; absent if none do.
    pub mean_average_precision: Option<f64>,
}

impl FrameLevelReport {
    pub fn class(&self, label: &str) -> Option<&ClassAveragePrecision> {
        self.classes.iter().find(|c| c.label == label)
    }

    /// Average precision for one class, if it had ground truth.
    pub fn average_precision(&self, label: &str) -> Option<f64> {
        self.class(label).and_then(|c| c.average_precision)
    }
}

impl fmt::Display for FrameLevelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Frame-level mAP@{:.2} ({} video(s))",
            self.iou_threshold, self.num_videos
        )?;
        writeln!(
            f,
            "  {:<12} {:>8} {:>6} {:>6} {:>6} {:>6} {:>6}",
            "class", "AP", "GT", "DET", "TP", "FP", "FN"
        )?;
        for c in &self.classes {
            let ap = c
                .average_precision
                .map_or_else(|| "-".to_string(), |ap| format!("{ap:.4}"));
            writeln!(
                f,
                "  {:<12} {:>8} {:>6} {:>6} {:>6} {:>6} {:>6}",
                c.label,
                ap,
                c.ground_truths,
                c.detections,
                c.true_positives,
                c.false_positives,
                c.false_negatives
            )?;
        }
        let map = self
            .mean_average_precision
            .map_or_else(|| "-".to_string(), |m| format!("{m:.4}"));
        writeln!(f, "  {:<12} {:>8}", "overall", map)
    }
}
