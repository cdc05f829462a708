//! Video identity and the file naming convention that encodes it.
//!
//! Every uploaded video, and every annotation file made from it, is named
//! `<YYYY-MM-DD>_<HH-MM-SS>_<camera_id>` followed by any extension, e.g.
//! `2021-01-01_08-00-00_00001.mp4` or `2021-01-01_08-00-00_00001.xml`.
//! The `(camera_id, upload_timestamp)` pair is the join key between
//! ground truth and detector output.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::CameraId;
use crate::error::EvalError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H-%M-%S";
const TIME_FORMAT_NO_SECONDS: &str = "%H-%M";

/// Unique identity of one video: which camera, and when it was uploaded.
///
/// Ordering is by camera, then timestamp, so tables keyed by `VideoKey`
/// iterate deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VideoKey {
    pub camera_id: CameraId,
    pub upload_timestamp: NaiveDateTime,
}

impl VideoKey {
    pub fn new(camera_id: impl Into<CameraId>, upload_timestamp: NaiveDateTime) -> Self {
        Self {
            camera_id: camera_id.into(),
            upload_timestamp,
        }
    }

    /// Renders the key back into the naming convention, without extension.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{:05}",
            self.upload_timestamp.format(DATE_FORMAT),
            self.upload_timestamp.format(TIME_FORMAT),
            self.camera_id.as_u32()
        )
    }
}

impl fmt::Display for VideoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "camera {} @ {}",
            self.camera_id,
            self.upload_timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Parse `(camera_id, upload_timestamp)` out of a video or annotation name.
///
/// Accepts a bare file name or a full path (either separator). Anything from
/// the first `.` of the file name on is ignored.
pub fn parse_video_name(name: &str) -> Result<VideoKey, EvalError> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = file_name.split('.').next().unwrap_or_default();

    let malformed = |reason: String| EvalError::MalformedName {
        name: name.to_string(),
        reason,
    };

    let segments: Vec<&str> = stem.split('_').collect();
    let [date_raw, time_raw, camera_raw] = segments.as_slice() else {
        return Err(malformed(format!(
            "expected <date>_<time>_<camera_id>, found {} '_'-separated segment(s)",
            segments.len()
        )));
    };

    let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT)
        .map_err(|e| malformed(format!("invalid date '{date_raw}': {e}")))?;

    let time = NaiveTime::parse_from_str(time_raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(time_raw, TIME_FORMAT_NO_SECONDS))
        .map_err(|e| malformed(format!("invalid time '{time_raw}': {e}")))?;

    if camera_raw.is_empty() || !camera_raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(format!(
            "camera id '{camera_raw}' is not an unsigned integer"
        )));
    }
    let camera_id = camera_raw
        .parse::<u32>()
        .map_err(|e| malformed(format!("camera id '{camera_raw}' out of range: {e}")))?;

    Ok(VideoKey::new(camera_id, date.and_time(time)))
}
