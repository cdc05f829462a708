//! Frame-level evaluation: per-class average precision and chunk mAP.
//!
//! Every video is matched independently (frame by frame, class by class) on
//! the rayon pool; the per-video outcomes are then concatenated in key order
//! and ranked by confidence to build one precision/recall curve per class.

mod matching;
mod report;

pub use matching::{match_boxes, MatchOutcome, ScoredBox};
pub use report::{ClassAveragePrecision, FrameLevelReport};

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::index::EvaluableVideo;
use crate::ir::{BBoxXYXY, FrameDetection, FrameLevelTable, VideoKey};

/// Default IoU a detection needs to count as a true positive.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// Tunables for frame-level evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLevelOptions {
    pub iou_threshold: f64,
}

impl Default for FrameLevelOptions {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl FrameLevelOptions {
    pub fn with_iou_threshold(mut self, iou_threshold: f64) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }
}

/// Matches frame-level detections against ground truth.
#[derive(Debug)]
pub struct FrameLevelEvaluator<'a> {
    videos: &'a [EvaluableVideo<'a>],
    table: &'a FrameLevelTable,
    selected_labels: &'a BTreeSet<String>,
}

/// Ranked outcomes for one class, accumulated over frames and videos.
#[derive(Debug, Default)]
struct ClassTally {
    /// `(confidence, is_true_positive)` per detection.
    scored: Vec<(f64, bool)>,
    ground_truths: usize,
}

impl ClassTally {
    fn absorb(&mut self, other: ClassTally) {
        self.scored.extend(other.scored);
        self.ground_truths += other.ground_truths;
    }
}

/// Detections and ground truth sharing one frame and one class.
#[derive(Default)]
struct FrameCell {
    detections: Vec<ScoredBox>,
    ground_truth: Vec<BBoxXYXY>,
}

impl<'a> FrameLevelEvaluator<'a> {
    pub fn new(
        videos: &'a [EvaluableVideo<'a>],
        table: &'a FrameLevelTable,
        selected_labels: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            videos,
            table,
            selected_labels,
        }
    }

    pub fn evaluate(&self, opts: &FrameLevelOptions) -> FrameLevelReport {
        let detections = self.table.by_video();

        let per_video: Vec<BTreeMap<&str, ClassTally>> = self
            .videos
            .par_iter()
            .map(|video| {
                let rows = detections.get(&video.key).map_or(&[][..], Vec::as_slice);
                self.match_video(video, rows, opts.iou_threshold)
            })
            .collect();

        let mut totals: BTreeMap<&str, ClassTally> = self
            .selected_labels
            .iter()
            .map(|label| (label.as_str(), ClassTally::default()))
            .collect();
        for video in per_video {
            for (label, tally) in video {
                if let Some(total) = totals.get_mut(label) {
                    total.absorb(tally);
                }
            }
        }

        let classes: Vec<ClassAveragePrecision> = totals
            .into_iter()
            .map(|(label, tally)| summarize_class(label, tally))
            .collect();

        let scored: Vec<f64> = classes
            .iter()
            .filter_map(|c| c.average_precision)
            .collect();
        let mean_average_precision = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<f64>() / scored.len() as f64)
        };

        tracing::debug!(
            videos = self.videos.len(),
            classes = classes.len(),
            scored_classes = scored.len(),
            "frame-level evaluation done"
        );

        FrameLevelReport {
            iou_threshold: opts.iou_threshold,
            num_videos: self.videos.len(),
            classes,
            mean_average_precision,
        }
    }

    fn match_video(
        &self,
        video: &EvaluableVideo<'_>,
        detections: &[&FrameDetection],
        iou_threshold: f64,
    ) -> BTreeMap<&'a str, ClassTally> {
        let mut cells: BTreeMap<(u32, &'a str), FrameCell> = BTreeMap::new();

        for det in detections {
            if let Some(label) = self.selected(&det.label) {
                cells
                    .entry((det.frame, label))
                    .or_default()
                    .detections
                    .push(ScoredBox::new(det.bbox, det.confidence));
            }
        }
        for gt in &video.annotation().boxes {
            if let Some(label) = self.selected(&gt.label) {
                cells
                    .entry((gt.frame, label))
                    .or_default()
                    .ground_truth
                    .push(gt.bbox);
            }
        }

        let mut tallies: BTreeMap<&'a str, ClassTally> = BTreeMap::new();
        for ((_, label), cell) in cells {
            let tally = tallies.entry(label).or_default();
            tally.ground_truths += cell.ground_truth.len();
            tally.scored.extend(
                match_boxes(&cell.detections, &cell.ground_truth, iou_threshold)
                    .into_iter()
                    .map(|o| (o.confidence, o.is_true_positive())),
            );
        }

        log_video(&video.key, detections.len(), &tallies);
        tallies
    }

    fn selected(&self, label: &str) -> Option<&'a str> {
        self.selected_labels.get(label).map(String::as_str)
    }
}

fn log_video(key: &VideoKey, detections: usize, tallies: &BTreeMap<&str, ClassTally>) {
    let true_positives: usize = tallies
        .values()
        .map(|t| t.scored.iter().filter(|(_, tp)| *tp).count())
        .sum();
    let ground_truths: usize = tallies.values().map(|t| t.ground_truths).sum();
    tracing::debug!(video = %key, detections, ground_truths, true_positives, "video matched");
}

fn summarize_class(label: &str, tally: ClassTally) -> ClassAveragePrecision {
    let true_positives = tally.scored.iter().filter(|(_, tp)| *tp).count();
    let detections = tally.scored.len();
    ClassAveragePrecision {
        label: label.to_string(),
        average_precision: average_precision(&tally.scored, tally.ground_truths),
        ground_truths: tally.ground_truths,
        detections,
        true_positives,
        false_positives: detections - true_positives,
        false_negatives: tally.ground_truths - true_positives,
    }
}

/// Area under the all-point interpolated precision/recall curve.
///
/// `scored` holds `(confidence, is_true_positive)` for every detection of a
/// class; it is ranked by descending confidence, keeping the given order for
/// ties. Returns `None` when there is no ground truth to recall.
pub fn average_precision(scored: &[(f64, bool)], num_ground_truths: usize) -> Option<f64> {
    if num_ground_truths == 0 {
        return None;
    }

    let mut ranked: Vec<(f64, bool)> = scored.to_vec();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut precision = Vec::with_capacity(ranked.len());
    let mut tp = 0usize;
    for (rank, (_, is_tp)) in ranked.iter().enumerate() {
        if *is_tp {
            tp += 1;
        }
        precision.push(tp as f64 / (rank + 1) as f64);
    }

    // Interpolate: precision at rank i becomes the best precision at any
    // rank >= i.
    for i in (0..precision.len().saturating_sub(1)).rev() {
        if precision[i + 1] > precision[i] {
            precision[i] = precision[i + 1];
        }
    }

    // Recall only moves at true positives, by 1/num_ground_truths each time.
    let area: f64 = ranked
        .iter()
        .zip(&precision)
        .filter(|((_, is_tp), _)| *is_tp)
        .map(|(_, p)| *p)
        .sum();

    Some(area / num_ground_truths as f64)
}
