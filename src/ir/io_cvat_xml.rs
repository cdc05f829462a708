//! CVAT XML reader (video task export).
//!
//! This adapter supports CVAT "for video" task-export XML:
//! - root `<annotations>` containing `<track>` entries
//! - each `<track>` holds one `<box>` per frame the object was annotated in
//! - `<box outside="1">` marks frames where the object has left the view
//!
//! Traffic annotations label every track `vehicle` and record the vehicle
//! class in a per-box `<attribute name="type">`. Tracks with any other label
//! are taken to be labelled by class directly.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::io_annotation::AnnotationOptions;
use super::model::{AnnotatedBox, VideoAnnotation};
use super::{BBoxXYXY, ObjectId};
use crate::error::EvalError;

/// Read a CVAT video XML file into a normalized annotation.
pub fn read_cvat_xml(path: &Path, opts: &AnnotationOptions) -> Result<VideoAnnotation, EvalError> {
    let xml = fs::read_to_string(path).map_err(EvalError::Io)?;
    parse_cvat_xml_str(&xml, path, opts)
}

/// Parse CVAT XML from a string.
pub fn from_cvat_xml_str(xml: &str, opts: &AnnotationOptions) -> Result<VideoAnnotation, EvalError> {
    parse_cvat_xml_str(xml, Path::new("<string>"), opts)
}

/// Parse CVAT XML from bytes (must be valid UTF-8).
pub fn from_cvat_xml_slice(
    bytes: &[u8],
    opts: &AnnotationOptions,
) -> Result<VideoAnnotation, EvalError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| EvalError::CvatXmlParse {
        path: PathBuf::from("<bytes>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_cvat_xml_str(xml, Path::new("<bytes>"), opts)
}

pub(crate) fn parse_cvat_xml_str(
    xml: &str,
    path: &Path,
    opts: &AnnotationOptions,
) -> Result<VideoAnnotation, EvalError> {
    let document = Document::parse(xml).map_err(|source| EvalError::CvatXmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let root = document.root_element();
    if root.tag_name().name() != "annotations" {
        return Err(EvalError::CvatXmlParse {
            path: path.to_path_buf(),
            message: "missing <annotations> root element".to_string(),
        });
    }

    let mut boxes = Vec::new();
    for track in root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "track")
    {
        parse_track_element(track, path, opts, &mut boxes)?;
    }

    boxes.sort_by_key(|b| (b.frame, b.object_id));
    Ok(VideoAnnotation::new(boxes))
}

fn parse_track_element(
    track: Node<'_, '_>,
    path: &Path,
    opts: &AnnotationOptions,
    out: &mut Vec<AnnotatedBox>,
) -> Result<(), EvalError> {
    let track_label = required_attr(track, "label", path, "<track>")?.trim();
    let object_id = track
        .attribute("id")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|raw| {
            raw.parse::<u64>()
                .map(ObjectId::new)
                .map_err(|_| EvalError::CvatXmlParse {
                    path: path.to_path_buf(),
                    message: format!("invalid <track id> value '{raw}'; expected u64"),
                })
        })
        .transpose()?;

    let is_generic_track = track_label == opts.cvat_label;

    for node in track
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "box")
    {
        let frame = parse_required_u32_attr(node, "frame", path, "<box>")?;

        let outside = node
            .attribute("outside")
            .map(str::trim)
            .map(|raw| match raw {
                "0" | "" => Ok(false),
                "1" => Ok(true),
                _ => Err(EvalError::CvatXmlParse {
                    path: path.to_path_buf(),
                    message: format!(
                        "<box> in frame {frame} has invalid outside='{raw}'; expected '0' or '1'"
                    ),
                }),
            })
            .transpose()?
            .unwrap_or(false);
        if outside {
            continue;
        }

        let xtl = parse_required_f64_attr(node, "xtl", path, frame)?;
        let ytl = parse_required_f64_attr(node, "ytl", path, frame)?;
        let xbr = parse_required_f64_attr(node, "xbr", path, frame)?;
        let ybr = parse_required_f64_attr(node, "ybr", path, frame)?;

        let label = if is_generic_track {
            box_attribute(node, &opts.cvat_type_attribute)
                .unwrap_or_else(|| track_label.to_string())
        } else {
            track_label.to_string()
        };

        let mut parsed = AnnotatedBox::new(frame, label, BBoxXYXY::from_xyxy(xtl, ytl, xbr, ybr));
        parsed.object_id = object_id;
        out.push(parsed);
    }

    Ok(())
}

fn box_attribute(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "attribute")
        .find(|n| n.attribute("name").map(str::trim) == Some(name))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn required_attr<'a>(
    node: Node<'a, '_>,
    attr: &str,
    path: &Path,
    context: &str,
) -> Result<&'a str, EvalError> {
    node.attribute(attr).ok_or_else(|| EvalError::CvatXmlParse {
        path: path.to_path_buf(),
        message: format!("missing '{attr}' attribute in {context}"),
    })
}

fn parse_required_u32_attr(
    node: Node<'_, '_>,
    attr: &str,
    path: &Path,
    context: &str,
) -> Result<u32, EvalError> {
    let raw = required_attr(node, attr, path, context)?;
    raw.trim()
        .parse::<u32>()
        .map_err(|_| EvalError::CvatXmlParse {
            path: path.to_path_buf(),
            message: format!("invalid '{attr}' value '{raw}' in {context}; expected u32"),
        })
}

fn parse_required_f64_attr(
    node: Node<'_, '_>,
    attr: &str,
    path: &Path,
    frame: u32,
) -> Result<f64, EvalError> {
    let raw = required_attr(node, attr, path, "<box>")?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| EvalError::CvatXmlParse {
            path: path.to_path_buf(),
            message: format!(
                "<box> in frame {frame} has invalid {attr}='{raw}'; expected floating-point number"
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotations>
  <version>1.1</version>
  <meta><task><name>2021-01-01_08-00-00_00001</name></task></meta>
  <track id="0" label="vehicle" source="manual">
    <box frame="0" outside="0" occluded="0" keyframe="1" xtl="10" ytl="20" xbr="50" ybr="60" z_order="0">
      <attribute name="stopped">false</attribute>
      <attribute name="type">car</attribute>
    </box>
    <box frame="1" outside="0" occluded="0" keyframe="0" xtl="12" ytl="20" xbr="52" ybr="60" z_order="0">
      <attribute name="type">car</attribute>
    </box>
    <box frame="2" outside="1" occluded="0" keyframe="1" xtl="14" ytl="20" xbr="54" ybr="60" z_order="0">
      <attribute name="type">car</attribute>
    </box>
  </track>
  <track id="1" label="vehicle" source="manual">
    <box frame="1" outside="0" occluded="1" keyframe="1" xtl="100" ytl="100" xbr="180" ybr="160" z_order="0">
      <attribute name="type">bus</attribute>
    </box>
  </track>
  <track id="2" label="pedestrian" source="manual">
    <box frame="0" outside="0" occluded="0" keyframe="1" xtl="1" ytl="1" xbr="5" ybr="15" z_order="0"/>
  </track>
</annotations>"#;

    #[test]
    fn parses_tracks_into_boxes() {
        let ann = from_cvat_xml_str(SAMPLE, &AnnotationOptions::default()).unwrap();
        assert_eq!(ann.boxes.len(), 4);

        let first = &ann.boxes[0];
        assert_eq!(first.frame, 0);
        assert_eq!(first.label, "car");
        assert_eq!(first.object_id, Some(ObjectId(0)));
        assert_eq!(first.bbox, BBoxXYXY::from_xyxy(10.0, 20.0, 50.0, 60.0));
    }

    #[test]
    fn drops_outside_boxes() {
        let ann = from_cvat_xml_str(SAMPLE, &AnnotationOptions::default()).unwrap();
        assert!(ann.boxes.iter().all(|b| b.frame != 2));
    }

    #[test]
    fn non_generic_tracks_keep_their_label() {
        let ann = from_cvat_xml_str(SAMPLE, &AnnotationOptions::default()).unwrap();
        assert!(ann.boxes.iter().any(|b| b.label == "pedestrian"));
    }

    #[test]
    fn counts_tracks_not_boxes() {
        let ann = from_cvat_xml_str(SAMPLE, &AnnotationOptions::default()).unwrap();
        let counts = ann.object_counts();
        assert_eq!(counts.get("car"), Some(&1));
        assert_eq!(counts.get("bus"), Some(&1));
    }

    #[test]
    fn parse_rejects_invalid_root() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?><sequence></sequence>"#;
        let err = from_cvat_xml_str(xml, &AnnotationOptions::default()).unwrap_err();
        match err {
            EvalError::CvatXmlParse { message, .. } => assert!(message.contains("<annotations>")),
            other => panic!("expected CvatXmlParse, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_bad_coordinate() {
        let xml = r#"<annotations><track id="0" label="vehicle">
            <box frame="3" outside="0" xtl="abc" ytl="0" xbr="1" ybr="1"/>
        </track></annotations>"#;
        let err = from_cvat_xml_str(xml, &AnnotationOptions::default()).unwrap_err();
        match err {
            EvalError::CvatXmlParse { message, .. } => {
                assert!(message.contains("frame 3"));
                assert!(message.contains("xtl"));
            }
            other => panic!("expected CvatXmlParse, got {other:?}"),
        }
    }

    #[test]
    fn missing_type_attribute_falls_back_to_track_label() {
        let xml = r#"<annotations><track id="4" label="vehicle">
            <box frame="0" outside="0" xtl="0" ytl="0" xbr="1" ybr="1"/>
        </track></annotations>"#;
        let ann = from_cvat_xml_str(xml, &AnnotationOptions::default()).unwrap();
        assert_eq!(ann.boxes[0].label, "vehicle");
    }
}
