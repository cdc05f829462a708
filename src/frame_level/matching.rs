//! Greedy IoU matching of detections to ground truth within one frame.

use crate::ir::BBoxXYXY;

/// A detected box with its confidence, as seen by the matcher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    pub bbox: BBoxXYXY,
    pub confidence: f64,
}

impl ScoredBox {
    pub fn new(bbox: BBoxXYXY, confidence: f64) -> Self {
        Self { bbox, confidence }
    }
}

/// What happened to one detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchOutcome {
    /// Index of the detection in the matcher's input.
    pub detection: usize,
    pub confidence: f64,
    /// Ground-truth index this detection was matched to (true positive).
    pub matched: Option<usize>,
    /// Best IoU against any ground truth still unmatched at its turn.
    pub best_iou: f64,
}

impl MatchOutcome {
    pub fn is_true_positive(&self) -> bool {
        self.matched.is_some()
    }
}

/// Matches detections to ground-truth boxes of one class in one frame.
///
/// Detections are visited in descending confidence (ties keep input order).
/// Each takes the still-unmatched ground truth it overlaps most, provided
/// that IoU is at least `iou_threshold`; otherwise it is a false positive.
/// A ground-truth box is matched at most once.
///
/// Outcomes are returned in visiting order.
pub fn match_boxes(
    detections: &[ScoredBox],
    ground_truth: &[BBoxXYXY],
    iou_threshold: f64,
) -> Vec<MatchOutcome> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .total_cmp(&detections[a].confidence)
    });

    let mut used = vec![false; ground_truth.len()];
    let mut outcomes = Vec::with_capacity(detections.len());

    for det_idx in order {
        let det = &detections[det_idx];

        let mut best: Option<(usize, f64)> = None;
        for (gt_idx, gt) in ground_truth.iter().enumerate() {
            if used[gt_idx] {
                continue;
            }
            let iou = det.bbox.iou(gt);
            let better = match best {
                Some((_, best_iou)) => iou > best_iou,
                None => true,
            };
            if better {
                best = Some((gt_idx, iou));
            }
        }

        let best_iou = best.map_or(0.0, |(_, iou)| iou);
        let matched = match best {
            Some((gt_idx, iou)) if iou >= iou_threshold && iou > 0.0 => {
                used[gt_idx] = true;
                Some(gt_idx)
            }
            _ => None,
        };

        outcomes.push(MatchOutcome {
            detection: det_idx,
            confidence: det.confidence,
            matched,
            best_iou,
        });
    }

    outcomes
}
