//! Detection table CSV readers.
//!
//! Two layouts are supported, both keyed by `camera_id` and
//! `video_upload_datetime` (`YYYY-MM-DD HH:MM:SS`):
//!
//! Frame-level (one row per detected box):
//!
//! ```text
//! camera_id,video_upload_datetime,frame_id,obj_classification,confidence,xmin,ymin,xmax,ymax
//! 1,2021-01-01 08:00:00,0,car,0.91,10,20,50,60
//! ```
//!
//! Video-level (one row per video, one count column per class):
//!
//! ```text
//! camera_id,video_upload_datetime,car,bus,truck
//! 1,2021-01-01 08:00:00,12,1,0
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use super::model::{FrameDetection, FrameLevelTable, VideoLevelTable};
use super::{BBoxXYXY, VideoKey};
use crate::error::EvalError;

const CAMERA_COLUMN: &str = "camera_id";
const DATETIME_COLUMN: &str = "video_upload_datetime";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A single row in the frame-level CSV format.
#[derive(Debug, Deserialize)]
struct FrameRow {
    camera_id: u32,
    video_upload_datetime: String,
    frame_id: u32,
    obj_classification: String,
    confidence: f64,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

/// Parse an upload timestamp as written in detection tables.
pub fn parse_upload_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Reads a frame-level detection table from a CSV file.
pub fn read_frame_level_csv(path: &Path) -> Result<FrameLevelTable, EvalError> {
    let file = File::open(path).map_err(EvalError::Io)?;
    frame_level_from_reader(BufReader::new(file), path)
}

/// Reads a frame-level detection table from a CSV string.
pub fn from_frame_level_csv_str(csv_str: &str) -> Result<FrameLevelTable, EvalError> {
    frame_level_from_reader(csv_str.as_bytes(), Path::new("<string>"))
}

/// Reads a video-level detection table from a CSV file.
pub fn read_video_level_csv(path: &Path) -> Result<VideoLevelTable, EvalError> {
    let file = File::open(path).map_err(EvalError::Io)?;
    video_level_from_reader(BufReader::new(file), path)
}

/// Reads a video-level detection table from a CSV string.
pub fn from_video_level_csv_str(csv_str: &str) -> Result<VideoLevelTable, EvalError> {
    video_level_from_reader(csv_str.as_bytes(), Path::new("<string>"))
}

fn frame_level_from_reader<R: Read>(reader: R, path: &Path) -> Result<FrameLevelTable, EvalError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut table = FrameLevelTable::default();

    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: FrameRow = result.map_err(|source| EvalError::DetectionCsvParse {
            path: path.to_path_buf(),
            source,
        })?;

        let timestamp = parse_upload_datetime(&row.video_upload_datetime).ok_or_else(|| {
            EvalError::DetectionCsvInvalid {
                path: path.to_path_buf(),
                message: format!(
                    "row {}: invalid {DATETIME_COLUMN} '{}'",
                    idx + 1,
                    row.video_upload_datetime
                ),
            }
        })?;

        table.push(FrameDetection::new(
            VideoKey::new(row.camera_id, timestamp),
            row.frame_id,
            row.obj_classification,
            BBoxXYXY::from_xyxy(row.xmin, row.ymin, row.xmax, row.ymax),
            row.confidence,
        ))?;
    }

    Ok(table)
}

fn video_level_from_reader<R: Read>(reader: R, path: &Path) -> Result<VideoLevelTable, EvalError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|source| EvalError::DetectionCsvParse {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let invalid = |message: String| EvalError::DetectionCsvInvalid {
        path: path.to_path_buf(),
        message,
    };

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| invalid(format!("missing required column '{name}'")))
    };
    let camera_idx = position(CAMERA_COLUMN)?;
    let datetime_idx = position(DATETIME_COLUMN)?;

    let class_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != camera_idx && *idx != datetime_idx)
        .map(|(idx, name)| (idx, name.trim().to_string()))
        .collect();

    let mut table = VideoLevelTable::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|source| EvalError::DetectionCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        let line = row_idx + 1;

        let camera_raw = record.get(camera_idx).unwrap_or_default().trim();
        let camera_id = camera_raw
            .parse::<u32>()
            .map_err(|_| invalid(format!("row {line}: invalid {CAMERA_COLUMN} '{camera_raw}'")))?;

        let datetime_raw = record.get(datetime_idx).unwrap_or_default();
        let timestamp = parse_upload_datetime(datetime_raw)
            .ok_or_else(|| invalid(format!("row {line}: invalid {DATETIME_COLUMN} '{datetime_raw}'")))?;

        let mut counts = BTreeMap::new();
        for (idx, class) in &class_columns {
            let raw = record.get(*idx).unwrap_or_default().trim();
            if raw.is_empty() {
                continue;
            }
            let count = parse_count(raw)
                .ok_or_else(|| invalid(format!("row {line}: invalid count '{raw}' for '{class}'")))?;
            counts.insert(class.clone(), count);
        }

        table.insert(VideoKey::new(camera_id, timestamp), counts)?;
    }

    Ok(table)
}

/// Counts may be written as floats by upstream tooling ("3.0"). Anything
/// above `u32::MAX` is rejected rather than saturated.
fn parse_count(raw: &str) -> Option<u64> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(u64::from(n));
    }
    let value = raw.parse::<f64>().ok()?;
    let integral = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (integral && value <= f64::from(u32::MAX)).then_some(value as u64)
}
