//! End-to-end chunk evaluation from files on disk.

use std::collections::BTreeSet;

use jamcam_eval::chunk::ChunkEvaluator;
use jamcam_eval::config::EvalConfig;
use jamcam_eval::frame_level::FrameLevelOptions;
use jamcam_eval::index::{collect_annotation_files, AnnotationIndex};
use jamcam_eval::ir::io_cvat_xml::read_cvat_xml;
use jamcam_eval::ir::io_detections_csv::{read_frame_level_csv, read_video_level_csv};
use jamcam_eval::ir::io_detrac_xml::read_detrac_xml;
use jamcam_eval::ir::{parse_video_name, AnnotationFormat, AnnotationOptions};
use jamcam_eval::video_level::{DiffMeasure, Statistic};
use jamcam_eval::EvalError;

mod common;

use common::{ChunkFixture, CAMERA_1, CAMERA_2, CAMERA_3};

fn load_index(fixture: &ChunkFixture) -> AnnotationIndex {
    let files = collect_annotation_files(&[fixture.annotations_dir()]).expect("collect files");
    AnnotationIndex::load(&files, &AnnotationOptions::default()).expect("load index")
}

#[test]
fn index_reads_both_formats() {
    let fixture = ChunkFixture::new();
    let index = load_index(&fixture);

    assert_eq!(index.len(), 2);
    let cvat = index.get(&parse_video_name(CAMERA_1).unwrap()).unwrap();
    assert_eq!(cvat.format, Some(AnnotationFormat::Cvat));
    // Track 0's frame-2 box is outside the view.
    assert_eq!(cvat.annotation.boxes.len(), 4);
    assert_eq!(cvat.annotation.object_counts().get("car"), Some(&3));

    let detrac = index.get(&parse_video_name(CAMERA_2).unwrap()).unwrap();
    assert_eq!(detrac.format, Some(AnnotationFormat::Detrac));
    assert_eq!(detrac.annotation.object_counts().get("bus"), Some(&1));
    assert_eq!(detrac.annotation.boxes[0].frame, 0);
}

#[test]
fn format_specific_readers_agree_with_detection() {
    let fixture = ChunkFixture::new();
    let index = load_index(&fixture);

    let cvat = read_cvat_xml(&fixture.annotation(CAMERA_1), &AnnotationOptions::default()).unwrap();
    let detrac = read_detrac_xml(&fixture.annotation(CAMERA_2)).unwrap();

    assert_eq!(
        &cvat,
        &index.get(&parse_video_name(CAMERA_1).unwrap()).unwrap().annotation
    );
    assert_eq!(
        &detrac,
        &index.get(&parse_video_name(CAMERA_2).unwrap()).unwrap().annotation
    );
    assert_eq!(detrac.boxes[1].bbox.xmax, 62.0);
}

#[test]
fn evaluates_both_tables_over_annotated_videos_only() {
    let fixture = ChunkFixture::new();
    let index = load_index(&fixture);
    let video_table = read_video_level_csv(&fixture.video_level_csv()).unwrap();
    let frame_table = read_frame_level_csv(&fixture.frame_level_csv()).unwrap();
    let config = EvalConfig::default();

    let chunk = ChunkEvaluator::new(&index, config.selected_label_set())
        .with_video_level(&video_table, config.video_level_column_order.clone())
        .unwrap()
        .with_frame_level(&frame_table)
        .unwrap();

    assert_eq!(chunk.num_video_level_videos(), 2);
    assert_eq!(chunk.num_frame_level_videos(), 1);

    let camera_1 = parse_video_name(CAMERA_1).unwrap();
    let camera_2 = parse_video_name(CAMERA_2).unwrap();
    let camera_3 = parse_video_name(CAMERA_3).unwrap();

    let (perf, diff) = chunk.evaluate_video_level().unwrap();
    assert_eq!(diff.labels, vec!["car", "truck", "bus", "motorbike"]);
    assert_eq!(diff.diff(&camera_1, "car"), Some(-1));
    assert_eq!(diff.diff(&camera_2, "bus"), Some(0));
    assert_eq!(diff.diff(&camera_3, "car"), None);
    assert_eq!(perf.num_videos, 2);
    assert_eq!(perf.value(DiffMeasure::Diff, Statistic::Mean, "car"), Some(-0.5));
    assert_eq!(perf.value(DiffMeasure::AbsDiff, Statistic::Max, "car"), Some(1.0));

    let report = chunk
        .evaluate_frame_level(&FrameLevelOptions::default())
        .unwrap();
    let car = report.class("car").unwrap();
    assert_eq!(car.ground_truths, 4);
    assert_eq!(car.true_positives, 2);
    assert_eq!(car.false_positives, 1);
    assert_eq!(car.false_negatives, 2);
    let ap = car.average_precision.unwrap();
    assert!(ap < 1.0);
    assert!((ap - (1.0 + 2.0 / 3.0) / 4.0).abs() < 1e-9);

    // Camera 2's bus has no frame-level detections and is not in that join.
    assert_eq!(report.average_precision("bus"), None);
    assert_eq!(report.mean_average_precision, Some(ap));
}

#[test]
fn later_path_wins_for_the_same_video() {
    let dir = tempfile::tempdir().unwrap();
    let first = common::write(
        &dir.path().join("a").join(format!("{CAMERA_1}.xml")),
        common::CVAT_THREE_CARS,
    );
    let second = common::write(
        &dir.path().join("b").join(format!("{CAMERA_1}.cvat.xml")),
        common::DETRAC_ONE_BUS,
    );

    let index = AnnotationIndex::load(&[&first, &second], &AnnotationOptions::default()).unwrap();
    assert_eq!(index.len(), 1);
    let entry = index.get(&parse_video_name(CAMERA_1).unwrap()).unwrap();
    assert_eq!(entry.path, second);
    assert_eq!(entry.format, Some(AnnotationFormat::Detrac));
}

#[test]
fn malformed_name_aborts_loading() {
    let fixture = ChunkFixture::new();
    common::write(&fixture.annotations_dir().join("readme.xml"), "<annotations/>");

    let files = collect_annotation_files(&[fixture.annotations_dir()]).unwrap();
    let err = AnnotationIndex::load(&files, &AnnotationOptions::default()).unwrap_err();
    assert!(matches!(err, EvalError::MalformedName { .. }));
}

#[test]
fn broken_annotation_is_skipped_and_can_empty_the_join() {
    let fixture = ChunkFixture::new();
    common::write(&fixture.annotation(CAMERA_1), "<annotations><track");

    let index = load_index(&fixture);
    assert_eq!(index.len(), 1);

    let frame_table = read_frame_level_csv(&fixture.frame_level_csv()).unwrap();
    let labels: BTreeSet<String> = ["car".to_string()].into();
    let err = ChunkEvaluator::new(&index, labels)
        .with_frame_level(&frame_table)
        .unwrap_err();
    assert!(matches!(err, EvalError::NoMatchingAnnotations { .. }));
}

#[test]
fn custom_cvat_label_changes_what_counts() {
    let fixture = ChunkFixture::new();
    let opts = AnnotationOptions {
        cvat_label: "something-else".to_string(),
        ..AnnotationOptions::default()
    };
    let files = collect_annotation_files(&[fixture.annotations_dir()]).unwrap();
    let index = AnnotationIndex::load(&files, &opts).unwrap();

    let cvat = index.get(&parse_video_name(CAMERA_1).unwrap()).unwrap();
    assert_eq!(cvat.annotation.object_counts().get("vehicle"), Some(&3));
    assert_eq!(cvat.annotation.object_counts().get("car"), None);
}
