#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const CAMERA_1: &str = "2021-01-01_08-00-00_00001";
pub const CAMERA_2: &str = "2021-01-01_08-00-00_00002";
pub const CAMERA_3: &str = "2021-01-01_08-00-00_00003";

/// CVAT video export: three cars in frame 0, tracked under the generic
/// "vehicle" label; car 0 leaves the frame at frame 2.
pub const CVAT_THREE_CARS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotations>
  <version>1.1</version>
  <track id="0" label="vehicle">
    <box frame="0" outside="0" occluded="0" keyframe="1" xtl="0" ytl="0" xbr="10" ybr="10">
      <attribute name="type">car</attribute>
    </box>
    <box frame="1" outside="0" occluded="0" keyframe="0" xtl="1" ytl="0" xbr="11" ybr="10">
      <attribute name="type">car</attribute>
    </box>
    <box frame="2" outside="1" occluded="0" keyframe="1" xtl="2" ytl="0" xbr="12" ybr="10">
      <attribute name="type">car</attribute>
    </box>
  </track>
  <track id="1" label="vehicle">
    <box frame="0" outside="0" occluded="0" keyframe="1" xtl="100" ytl="0" xbr="110" ybr="10">
      <attribute name="type">car</attribute>
    </box>
  </track>
  <track id="2" label="vehicle">
    <box frame="0" outside="0" occluded="0" keyframe="1" xtl="200" ytl="0" xbr="210" ybr="10">
      <attribute name="type">car</attribute>
    </box>
  </track>
</annotations>
"#;

/// UA-DETRAC sequence: one bus across two frames.
pub const DETRAC_ONE_BUS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<sequence name="MVI_00002">
  <sequence_attribute camera_state="unstable" sence_weather="sunny"/>
  <ignored_region/>
  <frame density="1" num="1">
    <target_list>
      <target id="1">
        <box left="20" top="20" width="40" height="30"/>
        <attribute orientation="0" speed="0" trajectory_length="2" truncation_ratio="0" vehicle_type="bus"/>
      </target>
    </target_list>
  </frame>
  <frame density="1" num="2">
    <target_list>
      <target id="1">
        <box left="22" top="20" width="40" height="30"/>
        <attribute orientation="0" speed="1" trajectory_length="2" truncation_ratio="0" vehicle_type="bus"/>
      </target>
    </target_list>
  </frame>
</sequence>
"#;

/// Frame-level detections for camera 1: two of the three cars found, plus
/// one spurious car.
pub const FRAME_LEVEL_CSV: &str = "\
camera_id,video_upload_datetime,frame_id,obj_classification,confidence,xmin,ymin,xmax,ymax
1,2021-01-01 08:00:00,0,car,0.9,0,0,10,10
1,2021-01-01 08:00:00,0,car,0.8,100,0,110,10
1,2021-01-01 08:00:00,0,car,0.85,500,0,510,10
3,2021-01-01 08:00:00,0,car,0.7,0,0,10,10
";

/// Video-level counts: camera 1 under-counts cars, camera 2 finds its bus.
pub const VIDEO_LEVEL_CSV: &str = "\
camera_id,video_upload_datetime,car,bus,truck
1,2021-01-01 08:00:00,2,0,0
2,2021-01-01 08:00:00,0,1,0
3,2021-01-01 08:00:00,5,0,0
";

pub fn write(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write fixture");
    path.to_path_buf()
}

/// Lays out a chunk: annotations for cameras 1 and 2 under `annotations/`,
/// and both detection tables at the root.
pub struct ChunkFixture {
    pub dir: tempfile::TempDir,
}

impl ChunkFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(
            &root.join("annotations").join(format!("{CAMERA_1}.xml")),
            CVAT_THREE_CARS,
        );
        write(
            &root.join("annotations").join(format!("{CAMERA_2}.xml")),
            DETRAC_ONE_BUS,
        );
        write(&root.join("frame_level.csv"), FRAME_LEVEL_CSV);
        write(&root.join("video_level.csv"), VIDEO_LEVEL_CSV);
        Self { dir }
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.dir.path().join("annotations")
    }

    pub fn annotation(&self, stem: &str) -> PathBuf {
        self.annotations_dir().join(format!("{stem}.xml"))
    }

    pub fn frame_level_csv(&self) -> PathBuf {
        self.dir.path().join("frame_level.csv")
    }

    pub fn video_level_csv(&self) -> PathBuf {
        self.dir.path().join("video_level.csv")
    }
}
