//! Annotation source formats and format-agnostic reading.

use std::fmt;
use std::fs;
use std::path::Path;

use roxmltree::Document;
use serde::{Deserialize, Serialize};

use super::io_cvat_xml::parse_cvat_xml_str;
use super::io_detrac_xml::parse_detrac_xml_str;
use super::model::VideoAnnotation;
use crate::error::EvalError;

/// The closed set of supported ground-truth formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationFormat {
    /// CVAT video task export (`<annotations>` of `<track>`s).
    Cvat,
    /// UA-DETRAC sequence XML (`<sequence>` of `<frame>`s).
    Detrac,
}

impl AnnotationFormat {
    /// Identify the format from the XML root element name.
    pub fn from_root_element(name: &str) -> Option<Self> {
        match name {
            "annotations" => Some(AnnotationFormat::Cvat),
            "sequence" => Some(AnnotationFormat::Detrac),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationFormat::Cvat => write!(f, "cvat"),
            AnnotationFormat::Detrac => write!(f, "detrac"),
        }
    }
}

/// Options that affect how annotation files are normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationOptions {
    /// CVAT track label meaning "some vehicle; see the type attribute".
    pub cvat_label: String,
    /// Name of the per-box CVAT attribute that holds the vehicle class.
    pub cvat_type_attribute: String,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            cvat_label: "vehicle".to_string(),
            cvat_type_attribute: "type".to_string(),
        }
    }
}

/// Read one annotation file, detecting its format from the root element.
pub fn read_annotation(
    path: &Path,
    opts: &AnnotationOptions,
) -> Result<(AnnotationFormat, VideoAnnotation), EvalError> {
    let xml = fs::read_to_string(path).map_err(EvalError::Io)?;
    parse_annotation_str(&xml, path, opts)
}

/// Parse annotation XML of either supported format.
pub fn from_annotation_str(
    xml: &str,
    opts: &AnnotationOptions,
) -> Result<(AnnotationFormat, VideoAnnotation), EvalError> {
    parse_annotation_str(xml, Path::new("<string>"), opts)
}

fn parse_annotation_str(
    xml: &str,
    path: &Path,
    opts: &AnnotationOptions,
) -> Result<(AnnotationFormat, VideoAnnotation), EvalError> {
    let root_name = {
        let document = Document::parse(xml).map_err(|source| {
            EvalError::AnnotationFormatUnknown {
                path: path.to_path_buf(),
                message: source.to_string(),
            }
        })?;
        document.root_element().tag_name().name().to_string()
    };

    let format = AnnotationFormat::from_root_element(&root_name).ok_or_else(|| {
        EvalError::AnnotationFormatUnknown {
            path: path.to_path_buf(),
            message: format!(
                "root element <{root_name}> is neither CVAT <annotations> nor UA-DETRAC <sequence>"
            ),
        }
    })?;

    let annotation = match format {
        AnnotationFormat::Cvat => parse_cvat_xml_str(xml, path, opts)?,
        AnnotationFormat::Detrac => parse_detrac_xml_str(xml, path)?,
    };
    Ok((format, annotation))
}
