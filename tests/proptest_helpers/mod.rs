#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use jamcam_eval::frame_level::ScoredBox;
use jamcam_eval::ir::{BBoxXYXY, VideoKey};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Timestamps with whole seconds, 2000 through 2099.
pub fn arb_timestamp() -> impl Strategy<Value = NaiveDateTime> {
    (2000i32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| {
            NaiveDate::from_ymd_opt(y, mo, d)
                .and_then(|date| date.and_hms_opt(h, mi, s))
                .expect("generated components are in range")
        },
    )
}

pub fn arb_video_key() -> impl Strategy<Value = VideoKey> {
    (any::<u32>(), arb_timestamp()).prop_map(|(camera, ts)| VideoKey::new(camera, ts))
}

/// Well-formed boxes inside a 640x480 frame, at least one pixel across.
pub fn arb_bbox() -> impl Strategy<Value = BBoxXYXY> {
    (0.0f64..600.0, 0.0f64..440.0, 1.0f64..40.0, 1.0f64..40.0)
        .prop_map(|(x, y, w, h)| BBoxXYXY::from_xywh(x, y, w, h))
}

pub fn arb_scored_box() -> impl Strategy<Value = ScoredBox> {
    (arb_bbox(), 0.0f64..=1.0).prop_map(|(bbox, confidence)| ScoredBox::new(bbox, confidence))
}
