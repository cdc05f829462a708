//! Evaluation settings, loaded once by the entry point and passed down.
//!
//! A YAML config file may set any subset of the fields; the rest keep their
//! defaults:
//!
//! ```yaml
//! selected_labels: [car, bus]
//! video_level_column_order: [car, truck, bus, motorbike]
//! iou_threshold: 0.5
//! annotations:
//!   cvat_label: vehicle
//!   cvat_type_attribute: type
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::EvalError;
use crate::frame_level::{FrameLevelOptions, DEFAULT_IOU_THRESHOLD};
use crate::ir::AnnotationOptions;

/// Vehicle classes evaluated when nothing else is configured.
pub const DEFAULT_LABELS: [&str; 4] = ["car", "truck", "bus", "motorbike"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Classes to evaluate; everything else is ignored.
    pub selected_labels: Vec<String>,
    /// Class columns of the video-level outputs, in order.
    pub video_level_column_order: Vec<String>,
    pub iou_threshold: f64,
    pub annotations: AnnotationOptions,
}

impl Default for EvalConfig {
    fn default() -> Self {
        let labels: Vec<String> = DEFAULT_LABELS.iter().map(|s| s.to_string()).collect();
        Self {
            selected_labels: labels.clone(),
            video_level_column_order: labels,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            annotations: AnnotationOptions::default(),
        }
    }
}

impl EvalConfig {
    /// Read a YAML config file.
    pub fn load(path: &Path) -> Result<Self, EvalError> {
        let data = fs::read_to_string(path).map_err(EvalError::Io)?;
        Self::parse(&data, path)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, EvalError> {
        Self::parse(yaml, Path::new("<string>"))
    }

    fn parse(yaml: &str, path: &Path) -> Result<Self, EvalError> {
        serde_yaml::from_str(yaml).map_err(|source| EvalError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks values serde cannot: the IoU range and non-empty label lists.
    pub fn validate(&self) -> Result<(), EvalError> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(EvalError::InvalidConfig {
                message: format!("iou_threshold {} is outside [0, 1]", self.iou_threshold),
            });
        }
        if self.selected_labels.is_empty() {
            return Err(EvalError::InvalidConfig {
                message: "selected_labels is empty".to_string(),
            });
        }
        if self.video_level_column_order.is_empty() {
            return Err(EvalError::InvalidConfig {
                message: "video_level_column_order is empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn selected_label_set(&self) -> BTreeSet<String> {
        self.selected_labels.iter().cloned().collect()
    }

    pub fn frame_level_options(&self) -> FrameLevelOptions {
        FrameLevelOptions::default().with_iou_threshold(self.iou_threshold)
    }
}
