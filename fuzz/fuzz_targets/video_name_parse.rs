//! Fuzz target for the video file name parser.
//!
//! Any name that parses must render back to a stem that parses to the
//! same key.

#![no_main]

use jamcam_eval::ir::parse_video_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(key) = parse_video_name(name) {
        let again = parse_video_name(&key.file_stem()).expect("canonical stem must parse");
        assert_eq!(again, key);
    }
});
