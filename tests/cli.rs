use assert_cmd::Command;
use predicates::prelude::*;

mod common;

use common::{ChunkFixture, CAMERA_1};

fn jamcam_eval() -> Command {
    Command::cargo_bin("jamcam-eval").unwrap()
}

#[test]
fn runs() {
    jamcam_eval().assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = jamcam_eval();
    cmd.arg("-V");
    cmd.assert().success().stdout("jamcam-eval 0.1.0\n");
}

// parse-name

#[test]
fn parse_name_prints_key() {
    let mut cmd = jamcam_eval();
    cmd.args(["parse-name", "uploads/2021-01-01_08-00-00_00001.mp4"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("camera_id=1"))
        .stdout(predicate::str::contains("uploaded=2021-01-01 08:00:00"))
        .stdout(predicate::str::contains("stem=2021-01-01_08-00-00_00001"));
}

#[test]
fn parse_name_rejects_malformed_names() {
    let mut cmd = jamcam_eval();
    cmd.args(["parse-name", "2021-01-01_08-00-00.mp4"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Malformed video or annotation name"));
}

// index

#[test]
fn index_lists_annotated_videos() {
    let fixture = ChunkFixture::new();
    let mut cmd = jamcam_eval();
    cmd.arg("index").arg(fixture.annotations_dir());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 annotated video(s)"))
        .stdout(predicate::str::contains("cvat"))
        .stdout(predicate::str::contains("detrac"));
}

#[test]
fn index_json_output() {
    let fixture = ChunkFixture::new();
    let output = jamcam_eval()
        .arg("index")
        .arg(fixture.annotations_dir())
        .args(["--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["camera_id"], 1);
    assert_eq!(rows[0]["format"], "cvat");
    assert_eq!(rows[1]["format"], "detrac");
}

#[test]
fn index_reports_unreadable_annotations() {
    let fixture = ChunkFixture::new();
    common::write(&fixture.annotation(CAMERA_1), "<annotations><track");

    let mut cmd = jamcam_eval();
    cmd.arg("index").arg(fixture.annotations_dir());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 annotated video(s), 1 unreadable"));

    let output = jamcam_eval()
        .arg("index")
        .arg(fixture.annotations_dir())
        .args(["--output", "json"])
        .output()
        .unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["loaded"], false);
    assert_eq!(rows[0]["format"], serde_json::Value::Null);
    assert_eq!(rows[1]["loaded"], true);
}

// evaluate

#[test]
fn evaluate_requires_a_detection_table() {
    let fixture = ChunkFixture::new();
    let mut cmd = jamcam_eval();
    cmd.arg("evaluate").arg("-a").arg(fixture.annotations_dir());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to evaluate"));
}

#[test]
fn evaluate_text_output() {
    let fixture = ChunkFixture::new();
    let mut cmd = jamcam_eval();
    cmd.arg("evaluate")
        .arg("-a")
        .arg(fixture.annotations_dir())
        .arg("--video-level")
        .arg(fixture.video_level_csv())
        .arg("--frame-level")
        .arg(fixture.frame_level_csv());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Video-level performance (2 video(s))"))
        .stdout(predicate::str::contains("mean_abs_diff"))
        .stdout(predicate::str::contains("Frame-level mAP@0.50 (1 video(s))"));
}

#[test]
fn evaluate_json_output() {
    let fixture = ChunkFixture::new();
    let output = jamcam_eval()
        .arg("evaluate")
        .arg("-a")
        .arg(fixture.annotations_dir())
        .arg("--video-level")
        .arg(fixture.video_level_csv())
        .arg("--frame-level")
        .arg(fixture.frame_level_csv())
        .args(["--labels", "car,bus", "--column-order", "bus,car"])
        .args(["--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let diff = &report["video_level"]["diff"];
    assert_eq!(diff["labels"], serde_json::json!(["bus", "car"]));
    assert_eq!(diff["rows"][0]["diff"], serde_json::json!([0, -1]));

    let frame = &report["frame_level"];
    assert_eq!(frame["num_videos"], 1);
    assert_eq!(frame["classes"].as_array().unwrap().len(), 2);
    assert!(frame["mean_average_precision"].as_f64().unwrap() < 1.0);
}

#[test]
fn evaluate_trims_label_lists() {
    let fixture = ChunkFixture::new();
    let output = jamcam_eval()
        .arg("evaluate")
        .arg("-a")
        .arg(fixture.annotations_dir())
        .arg("--video-level")
        .arg(fixture.video_level_csv())
        .arg("--frame-level")
        .arg(fixture.frame_level_csv())
        .args(["--labels", "car, bus", "--column-order", "bus , car"])
        .args(["--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let diff = &report["video_level"]["diff"];
    assert_eq!(diff["labels"], serde_json::json!(["bus", "car"]));
    let labels: Vec<&str> = report["frame_level"]["classes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"bus"));
    assert!(labels.contains(&"car"));
}

#[test]
fn evaluate_reads_config_file() {
    let fixture = ChunkFixture::new();
    let config = common::write(
        &fixture.dir.path().join("eval.yaml"),
        "selected_labels: [car]\nvideo_level_column_order: [car]\niou_threshold: 0.9\n",
    );
    let output = jamcam_eval()
        .arg("evaluate")
        .arg("-a")
        .arg(fixture.annotation(CAMERA_1))
        .arg("--frame-level")
        .arg(fixture.frame_level_csv())
        .arg("--config")
        .arg(&config)
        .args(["--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report.get("video_level").is_none());
    assert_eq!(report["frame_level"]["iou_threshold"], 0.9);
    assert_eq!(report["frame_level"]["classes"][0]["label"], "car");
}

#[test]
fn evaluate_rejects_table_without_annotated_videos() {
    let fixture = ChunkFixture::new();
    let csv = common::write(
        &fixture.dir.path().join("other.csv"),
        "camera_id,video_upload_datetime,car\n42,2021-01-01 08:00:00,1\n",
    );
    let mut cmd = jamcam_eval();
    cmd.arg("evaluate")
        .arg("-a")
        .arg(fixture.annotations_dir())
        .arg("--video-level")
        .arg(&csv);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No annotations match"));
}

#[test]
fn evaluate_rejects_bad_iou_threshold() {
    let fixture = ChunkFixture::new();
    let mut cmd = jamcam_eval();
    cmd.arg("evaluate")
        .arg("-a")
        .arg(fixture.annotations_dir())
        .arg("--frame-level")
        .arg(fixture.frame_level_csv())
        .args(["--iou-threshold", "1.5"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
