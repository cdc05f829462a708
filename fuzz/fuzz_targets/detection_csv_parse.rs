//! Fuzz target for the frame-level and video-level detection CSV readers.

#![no_main]

use jamcam_eval::ir::io_detections_csv::{from_frame_level_csv_str, from_video_level_csv_str};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(csv) = std::str::from_utf8(data) else {
        return;
    };
    let _ = from_frame_level_csv_str(csv);
    let _ = from_video_level_csv_str(csv);
});
