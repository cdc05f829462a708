//! Chunk evaluation: restrict detector output to annotated videos and run
//! the video-level and frame-level evaluators over them.

use std::collections::BTreeSet;

use crate::error::EvalError;
use crate::frame_level::{FrameLevelEvaluator, FrameLevelOptions, FrameLevelReport};
use crate::index::{AnnotationIndex, EvaluableVideo};
use crate::ir::{FrameLevelTable, VideoKey, VideoLevelTable};
use crate::video_level::{VideoLevelDiff, VideoLevelEvaluator, VideoLevelPerformance};

/// Video-level input: the table, its class column order, and its join.
#[derive(Debug)]
struct VideoLevelInput<'a> {
    table: &'a VideoLevelTable,
    column_order: Vec<String>,
    videos: Vec<EvaluableVideo<'a>>,
}

#[derive(Debug)]
struct FrameLevelInput<'a> {
    table: &'a FrameLevelTable,
    videos: Vec<EvaluableVideo<'a>>,
}

/// Evaluates one chunk of videos against its ground truth.
///
/// Each detection table is joined with the annotation index when it is
/// supplied; a table that shares no video with the index is rejected then
/// and there. The evaluator only borrows its inputs.
///
/// ```
/// use std::collections::BTreeSet;
/// use jamcam_eval::chunk::ChunkEvaluator;
/// use jamcam_eval::index::AnnotationIndex;
/// use jamcam_eval::ir::{parse_video_name, VideoAnnotation, VideoLevelTable};
///
/// let name = "2021-01-01_08-00-00_00001.xml";
/// let index = AnnotationIndex::new()
///     .with_annotation(name, VideoAnnotation::default())?;
/// let table = VideoLevelTable::new().with_row(parse_video_name(name)?, [("car", 2)])?;
/// let labels: BTreeSet<String> = ["car".to_string()].into();
///
/// let chunk = ChunkEvaluator::new(&index, labels)
///     .with_video_level(&table, vec!["car".to_string()])?;
/// let (_, diff) = chunk.evaluate_video_level()?;
/// assert_eq!(diff.rows[0].diff, vec![2]);
/// # Ok::<(), jamcam_eval::EvalError>(())
/// ```
#[derive(Debug)]
pub struct ChunkEvaluator<'a> {
    index: &'a AnnotationIndex,
    selected_labels: BTreeSet<String>,
    video_level: Option<VideoLevelInput<'a>>,
    frame_level: Option<FrameLevelInput<'a>>,
}

impl<'a> ChunkEvaluator<'a> {
    pub fn new(index: &'a AnnotationIndex, selected_labels: BTreeSet<String>) -> Self {
        Self {
            index,
            selected_labels,
            video_level: None,
            frame_level: None,
        }
    }

    /// Supplies the video-level detection table and the order of its class
    /// columns in the output.
    pub fn with_video_level(
        mut self,
        table: &'a VideoLevelTable,
        column_order: Vec<String>,
    ) -> Result<Self, EvalError> {
        let videos = self.index.join(&table.keys());
        if videos.is_empty() {
            return Err(EvalError::NoMatchingAnnotations {
                table: "video-level",
            });
        }
        tracing::info!(
            table_videos = table.len(),
            annotated = videos.len(),
            "video-level table joined"
        );
        self.video_level = Some(VideoLevelInput {
            table,
            column_order,
            videos,
        });
        Ok(self)
    }

    /// Supplies the frame-level detection table.
    pub fn with_frame_level(mut self, table: &'a FrameLevelTable) -> Result<Self, EvalError> {
        let keys = table.keys();
        let videos = self.index.join(&keys);
        if videos.is_empty() {
            return Err(EvalError::NoMatchingAnnotations {
                table: "frame-level",
            });
        }
        tracing::info!(
            table_videos = keys.len(),
            annotated = videos.len(),
            "frame-level table joined"
        );
        self.frame_level = Some(FrameLevelInput { table, videos });
        Ok(self)
    }

    pub fn selected_labels(&self) -> &BTreeSet<String> {
        &self.selected_labels
    }

    pub fn num_video_level_videos(&self) -> usize {
        self.video_level.as_ref().map_or(0, |v| v.videos.len())
    }

    pub fn num_frame_level_videos(&self) -> usize {
        self.frame_level.as_ref().map_or(0, |f| f.videos.len())
    }

    pub fn video_level_keys(&self) -> Vec<VideoKey> {
        self.video_level
            .as_ref()
            .map(|v| v.videos.iter().map(|e| e.key).collect())
            .unwrap_or_default()
    }

    pub fn frame_level_keys(&self) -> Vec<VideoKey> {
        self.frame_level
            .as_ref()
            .map(|f| f.videos.iter().map(|e| e.key).collect())
            .unwrap_or_default()
    }

    /// Count differences per video and their summary over the chunk.
    pub fn evaluate_video_level(
        &self,
    ) -> Result<(VideoLevelPerformance, VideoLevelDiff), EvalError> {
        let input = self.video_level.as_ref().ok_or(EvalError::NotConfigured {
            evaluation: "video-level",
        })?;
        self.require_labels()?;
        let evaluator = VideoLevelEvaluator::new(
            &input.videos,
            input.table,
            &input.column_order,
            &self.selected_labels,
        )?;
        tracing::info!(
            videos = input.videos.len(),
            classes = evaluator.labels().len(),
            "evaluating video level"
        );
        Ok(evaluator.evaluate())
    }

    /// Per-class AP and mAP over the chunk.
    pub fn evaluate_frame_level(
        &self,
        opts: &FrameLevelOptions,
    ) -> Result<FrameLevelReport, EvalError> {
        let input = self.frame_level.as_ref().ok_or(EvalError::NotConfigured {
            evaluation: "frame-level",
        })?;
        self.require_labels()?;
        tracing::info!(
            videos = input.videos.len(),
            detections = input.table.len(),
            iou_threshold = opts.iou_threshold,
            "evaluating frame level"
        );
        let report = FrameLevelEvaluator::new(&input.videos, input.table, &self.selected_labels)
            .evaluate(opts);
        Ok(report)
    }

    fn require_labels(&self) -> Result<(), EvalError> {
        if self.selected_labels.is_empty() {
            return Err(EvalError::NoSelectedLabels);
        }
        Ok(())
    }
}
