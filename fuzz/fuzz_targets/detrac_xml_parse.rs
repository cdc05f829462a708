//! Fuzz target for UA-DETRAC XML parsing.

#![no_main]

use jamcam_eval::ir::io_detrac_xml::from_detrac_xml_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let _ = from_detrac_xml_slice(data);
});
