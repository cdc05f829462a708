//! Ground-truth and detection records shared by every evaluator.
//!
//! Annotation readers normalize their source format into [`VideoAnnotation`];
//! detector output arrives as a [`FrameLevelTable`] (one row per detected
//! box) and/or a [`VideoLevelTable`] (one row of per-class counts per video).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::bbox::BBoxXYXY;
use super::ids::ObjectId;
use super::key::VideoKey;
use crate::error::EvalError;

/// One annotated object in one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedBox {
    /// Zero-based frame index within the video.
    pub frame: u32,

    /// Identity of the object across frames, when the source format tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,

    /// Vehicle class (e.g. "car", "bus").
    pub label: String,

    /// Bounding box in pixel coordinates.
    pub bbox: BBoxXYXY,
}

impl AnnotatedBox {
    /// Creates a new annotated box without an object id.
    pub fn new(frame: u32, label: impl Into<String>, bbox: BBoxXYXY) -> Self {
        Self {
            frame,
            object_id: None,
            label: label.into(),
            bbox,
        }
    }

    /// Sets the object (track) id for this box.
    pub fn with_object_id(mut self, object_id: impl Into<ObjectId>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }
}

/// All ground truth for one video.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotation {
    pub boxes: Vec<AnnotatedBox>,
}

impl VideoAnnotation {
    pub fn new(boxes: Vec<AnnotatedBox>) -> Self {
        Self { boxes }
    }

    /// Number of distinct annotated objects per class.
    ///
    /// Boxes sharing an object id are one object, classified by the label of
    /// its earliest box. Boxes without an id each count as their own object.
    pub fn object_counts(&self) -> BTreeMap<String, u64> {
        let mut first_seen: HashMap<ObjectId, &AnnotatedBox> = HashMap::new();
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();

        for b in &self.boxes {
            match b.object_id {
                Some(id) => {
                    let entry = first_seen.entry(id).or_insert(b);
                    if b.frame < entry.frame {
                        *entry = b;
                    }
                }
                None => *counts.entry(b.label.clone()).or_insert(0) += 1,
            }
        }

        for b in first_seen.into_values() {
            *counts.entry(b.label.clone()).or_insert(0) += 1;
        }

        counts
    }
}

/// One detector output box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDetection {
    pub key: VideoKey,
    pub frame: u32,
    pub label: String,
    pub bbox: BBoxXYXY,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
}

impl FrameDetection {
    pub fn new(
        key: VideoKey,
        frame: u32,
        label: impl Into<String>,
        bbox: BBoxXYXY,
        confidence: f64,
    ) -> Self {
        Self {
            key,
            frame,
            label: label.into(),
            bbox,
            confidence,
        }
    }

    fn check(&self) -> Result<(), EvalError> {
        if !self.bbox.is_finite() {
            return Err(EvalError::InvalidDetection {
                message: format!(
                    "{} frame {}: non-finite box {:?}",
                    self.key, self.frame, self.bbox
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EvalError::InvalidDetection {
                message: format!(
                    "{} frame {}: confidence {} outside [0, 1]",
                    self.key, self.frame, self.confidence
                ),
            });
        }
        Ok(())
    }
}

/// Frame-level detector output for any number of videos.
#[derive(Clone, Debug, Default)]
pub struct FrameLevelTable {
    rows: Vec<FrameDetection>,
}

impl FrameLevelTable {
    /// Builds a table, rejecting rows with a non-finite box or a confidence
    /// outside `[0, 1]`.
    pub fn new(rows: Vec<FrameDetection>) -> Result<Self, EvalError> {
        for row in &rows {
            row.check()?;
        }
        Ok(Self { rows })
    }

    pub fn push(&mut self, row: FrameDetection) -> Result<(), EvalError> {
        row.check()?;
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[FrameDetection] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct videos present in the table.
    pub fn keys(&self) -> BTreeSet<VideoKey> {
        self.rows.iter().map(|r| r.key).collect()
    }

    /// Rows grouped by video.
    pub fn by_video(&self) -> BTreeMap<VideoKey, Vec<&FrameDetection>> {
        let mut map: BTreeMap<VideoKey, Vec<&FrameDetection>> = BTreeMap::new();
        for row in &self.rows {
            map.entry(row.key).or_default().push(row);
        }
        map
    }
}

/// Video-level detector output: per-class object counts for each video.
#[derive(Clone, Debug, Default)]
pub struct VideoLevelTable {
    rows: BTreeMap<VideoKey, BTreeMap<String, u64>>,
}

impl VideoLevelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one video's counts. A second row for the same video is an error.
    pub fn insert(
        &mut self,
        key: VideoKey,
        counts: BTreeMap<String, u64>,
    ) -> Result<(), EvalError> {
        if self.rows.contains_key(&key) {
            return Err(EvalError::DuplicateVideoRow { key });
        }
        self.rows.insert(key, counts);
        Ok(())
    }

    /// Builder-style insertion from `(label, count)` pairs.
    pub fn with_row<'a>(
        mut self,
        key: VideoKey,
        counts: impl IntoIterator<Item = (&'a str, u64)>,
    ) -> Result<Self, EvalError> {
        let counts = counts
            .into_iter()
            .map(|(label, n)| (label.to_string(), n))
            .collect();
        self.insert(key, counts)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<VideoKey> {
        self.rows.keys().copied().collect()
    }

    /// Detected count for one class of one video; absent classes count zero.
    pub fn count(&self, key: &VideoKey, label: &str) -> u64 {
        self.rows
            .get(key)
            .and_then(|counts| counts.get(label))
            .copied()
            .unwrap_or(0)
    }
}
