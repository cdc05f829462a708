use std::path::PathBuf;
use thiserror::Error;

use crate::ir::VideoKey;

/// The main error type for jamcam-eval operations.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed video or annotation name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    #[error("No annotations match any video in the {table} detection table")]
    NoMatchingAnnotations { table: &'static str },

    #[error("{evaluation} evaluation requested but no {evaluation} detection table was supplied")]
    NotConfigured { evaluation: &'static str },

    #[error("No labels selected for evaluation")]
    NoSelectedLabels,

    #[error("None of the video-level columns {column_order:?} is a selected label")]
    NoEvaluableLabels { column_order: Vec<String> },

    #[error("Video-level table has more than one row for video {key}")]
    DuplicateVideoRow { key: VideoKey },

    #[error("Invalid detection: {message}")]
    InvalidDetection { message: String },

    #[error("Failed to parse CVAT XML from {path}: {message}")]
    CvatXmlParse { path: PathBuf, message: String },

    #[error("Failed to parse UA-DETRAC XML from {path}: {message}")]
    DetracXmlParse { path: PathBuf, message: String },

    #[error("Unrecognised annotation format in {path}: {message}")]
    AnnotationFormatUnknown { path: PathBuf, message: String },

    #[error("Failed to parse detection CSV from {path}: {source}")]
    DetectionCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid detection CSV {path}: {message}")]
    DetectionCsvInvalid { path: PathBuf, message: String },

    #[error("Failed to parse config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to collect annotation files under {path}: {message}")]
    AnnotationWalk { path: PathBuf, message: String },

    #[error("Nothing to evaluate: supply a video-level and/or a frame-level detection table")]
    NoDetectionTables,

    #[error("Failed to write JSON report: {0}")]
    ReportJson(#[from] serde_json::Error),
}
