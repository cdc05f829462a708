//! Intermediate representation for ground truth and detector output.
//!
//! Every annotation source format is normalized into the same shape
//! (frame index, object id, class label, pixel-space XYXY box), and detector
//! output is held in two read-only tables keyed by [`VideoKey`]. The
//! evaluators only ever see these types.
//!
//! # Example
//!
//! ```
//! use jamcam_eval::ir::{parse_video_name, AnnotatedBox, BBoxXYXY, VideoAnnotation};
//!
//! let key = parse_video_name("2021-01-01_08-00-00_00001.xml")?;
//! assert_eq!(key.camera_id.as_u32(), 1);
//!
//! let annotation = VideoAnnotation::new(vec![
//!     AnnotatedBox::new(0, "car", BBoxXYXY::from_xyxy(10.0, 20.0, 50.0, 60.0))
//!         .with_object_id(7u64),
//! ]);
//! assert_eq!(annotation.object_counts().get("car"), Some(&1));
//! # Ok::<(), jamcam_eval::EvalError>(())
//! ```

mod bbox;
mod ids;
pub mod io_annotation;
pub mod io_cvat_xml;
pub mod io_detections_csv;
pub mod io_detrac_xml;
mod key;
mod model;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use ids::{CameraId, ObjectId};
pub use io_annotation::{AnnotationFormat, AnnotationOptions};
pub use key::{parse_video_name, VideoKey};
pub use model::{
    AnnotatedBox, FrameDetection, FrameLevelTable, VideoAnnotation, VideoLevelTable,
};
