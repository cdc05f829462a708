//! UA-DETRAC XML reader.
//!
//! UA-DETRAC sequences list objects frame by frame:
//!
//! ```text
//! <sequence name="MVI_20011">
//!   <frame num="1" density="7">
//!     <target_list>
//!       <target id="1">
//!         <box left="592.75" top="378.8" width="160.05" height="162.2"/>
//!         <attribute orientation="18.488" speed="6.859" vehicle_type="car"/>
//!       </target>
//!     </target_list>
//!   </frame>
//! </sequence>
//! ```
//!
//! Frame numbers are 1-based in the source and are shifted to 0-based here
//! to line up with detector frame indices.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::model::{AnnotatedBox, VideoAnnotation};
use super::{BBoxXYXY, ObjectId};
use crate::error::EvalError;

/// Read a UA-DETRAC XML file into a normalized annotation.
pub fn read_detrac_xml(path: &Path) -> Result<VideoAnnotation, EvalError> {
    let xml = fs::read_to_string(path).map_err(EvalError::Io)?;
    parse_detrac_xml_str(&xml, path)
}

/// Parse UA-DETRAC XML from a string.
pub fn from_detrac_xml_str(xml: &str) -> Result<VideoAnnotation, EvalError> {
    parse_detrac_xml_str(xml, Path::new("<string>"))
}

/// Parse UA-DETRAC XML from bytes (must be valid UTF-8).
pub fn from_detrac_xml_slice(bytes: &[u8]) -> Result<VideoAnnotation, EvalError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| EvalError::DetracXmlParse {
        path: PathBuf::from("<bytes>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_detrac_xml_str(xml, Path::new("<bytes>"))
}

pub(crate) fn parse_detrac_xml_str(xml: &str, path: &Path) -> Result<VideoAnnotation, EvalError> {
    let document = Document::parse(xml).map_err(|source| EvalError::DetracXmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let root = document.root_element();
    if root.tag_name().name() != "sequence" {
        return Err(EvalError::DetracXmlParse {
            path: path.to_path_buf(),
            message: "missing <sequence> root element".to_string(),
        });
    }

    let mut boxes = Vec::new();
    for frame_node in root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "frame")
    {
        let num = parse_attr::<u32>(frame_node, "num", path, "<frame>")?;
        let frame = num.checked_sub(1).ok_or_else(|| EvalError::DetracXmlParse {
            path: path.to_path_buf(),
            message: "frame numbers start at 1; found num=\"0\"".to_string(),
        })?;

        let targets = frame_node
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "target");
        for target in targets {
            boxes.push(parse_target(target, frame, path)?);
        }
    }

    Ok(VideoAnnotation::new(boxes))
}

fn parse_target(target: Node<'_, '_>, frame: u32, path: &Path) -> Result<AnnotatedBox, EvalError> {
    let id = parse_attr::<u64>(target, "id", path, "<target>")?;

    let box_node = child_element(target, "box").ok_or_else(|| EvalError::DetracXmlParse {
        path: path.to_path_buf(),
        message: format!("<target id=\"{id}\"> in frame {} has no <box>", frame + 1),
    })?;
    let left = parse_attr::<f64>(box_node, "left", path, "<box>")?;
    let top = parse_attr::<f64>(box_node, "top", path, "<box>")?;
    let width = parse_attr::<f64>(box_node, "width", path, "<box>")?;
    let height = parse_attr::<f64>(box_node, "height", path, "<box>")?;

    let vehicle_type = child_element(target, "attribute")
        .and_then(|n| n.attribute("vehicle_type"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EvalError::DetracXmlParse {
            path: path.to_path_buf(),
            message: format!(
                "<target id=\"{id}\"> in frame {} has no vehicle_type attribute",
                frame + 1
            ),
        })?;

    Ok(
        AnnotatedBox::new(frame, vehicle_type, BBoxXYXY::from_xywh(left, top, width, height))
            .with_object_id(ObjectId::new(id)),
    )
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn parse_attr<T: std::str::FromStr>(
    node: Node<'_, '_>,
    attr: &str,
    path: &Path,
    context: &str,
) -> Result<T, EvalError> {
    let raw = node
        .attribute(attr)
        .ok_or_else(|| EvalError::DetracXmlParse {
            path: path.to_path_buf(),
            message: format!("missing '{attr}' attribute in {context}"),
        })?;
    raw.trim().parse::<T>().map_err(|_| EvalError::DetracXmlParse {
        path: path.to_path_buf(),
        message: format!("invalid '{attr}' value '{raw}' in {context}"),
    })
}
