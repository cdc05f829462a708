//! Annotation index: which videos have ground truth, and where it came from.
//!
//! The index maps each [`VideoKey`] to the annotation file it was read from
//! and the normalized boxes parsed out of that file. It is built once per
//! evaluation run and is read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::EvalError;
use crate::ir::io_annotation::read_annotation;
use crate::ir::{parse_video_name, AnnotationFormat, AnnotationOptions, VideoAnnotation, VideoKey};

/// One indexed annotation.
#[derive(Clone, Debug)]
pub struct IndexEntry {
    /// File the annotation was read from.
    pub path: PathBuf,
    /// Source format, when the annotation was read from disk.
    pub format: Option<AnnotationFormat>,
    /// Normalized ground truth.
    pub annotation: VideoAnnotation,
}

/// One video present in both the index and a detection table.
#[derive(Clone, Copy, Debug)]
pub struct EvaluableVideo<'a> {
    pub key: VideoKey,
    pub entry: &'a IndexEntry,
}

impl EvaluableVideo<'_> {
    pub fn annotation(&self) -> &VideoAnnotation {
        &self.entry.annotation
    }
}

/// Ground truth for a chunk of videos, keyed by video.
#[derive(Clone, Debug, Default)]
pub struct AnnotationIndex {
    entries: BTreeMap<VideoKey, IndexEntry>,
}

/// Map annotation paths to the video each one annotates, without reading them.
///
/// A path listed more than once is indexed once. When two distinct paths name
/// the same video, the later path wins. Any malformed file name aborts.
pub fn index_paths<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeMap<VideoKey, PathBuf>, EvalError> {
    Ok(unique_annotation_paths(paths)?
        .into_iter()
        .map(|(key, path)| (key, path.to_path_buf()))
        .collect())
}

/// Distinct paths in first-seen order, each with the video it names.
fn unique_annotation_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<(VideoKey, &Path)>, EvalError> {
    let mut seen: HashSet<&Path> = HashSet::new();
    let mut unique = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        if seen.insert(path) {
            unique.push((parse_video_name(&path.to_string_lossy())?, path));
        }
    }

    Ok(unique)
}

/// Expand files and directories into annotation file paths.
///
/// Files are kept as given. Directories are walked recursively for `.xml`
/// files, sorted by name so that "later path wins" is reproducible.
pub fn collect_annotation_files<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>, EvalError> {
    let mut files = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        if !input.is_dir() {
            files.push(input.to_path_buf());
            continue;
        }

        for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|source| EvalError::AnnotationWalk {
                path: input.to_path_buf(),
                message: source.to_string(),
            })?;
            if entry.file_type().is_file() && is_xml(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    Ok(files)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

impl AnnotationIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and indexes every annotation file in `paths`.
    ///
    /// File names are checked up front: one malformed name fails the whole
    /// load. A file that cannot be read or parsed is logged and skipped, so
    /// its video simply has no ground truth.
    pub fn load<P: AsRef<Path>>(paths: &[P], opts: &AnnotationOptions) -> Result<Self, EvalError> {
        let unique = unique_annotation_paths(paths)?;

        let mut index = Self::new();
        let mut skipped = 0usize;
        for (key, path) in unique {
            match read_annotation(path, opts) {
                Ok((format, annotation)) => {
                    tracing::debug!(
                        path = %path.display(),
                        %format,
                        boxes = annotation.boxes.len(),
                        "annotation loaded"
                    );
                    index.entries.insert(
                        key,
                        IndexEntry {
                            path: path.to_path_buf(),
                            format: Some(format),
                            annotation,
                        },
                    );
                }
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(path = %path.display(), error = %err, "skipping annotation file");
                }
            }
        }

        tracing::info!(videos = index.len(), skipped, "annotation index built");
        Ok(index)
    }

    /// Indexes an annotation that is already in memory.
    ///
    /// The video is identified from `path`'s file name. Returns the entry it
    /// replaced, if the video was already indexed.
    pub fn insert(
        &mut self,
        path: impl Into<PathBuf>,
        annotation: VideoAnnotation,
    ) -> Result<Option<IndexEntry>, EvalError> {
        let path = path.into();
        let key = parse_video_name(&path.to_string_lossy())?;
        Ok(self.entries.insert(
            key,
            IndexEntry {
                path,
                format: None,
                annotation,
            },
        ))
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_annotation(
        mut self,
        path: impl Into<PathBuf>,
        annotation: VideoAnnotation,
    ) -> Result<Self, EvalError> {
        self.insert(path, annotation)?;
        Ok(self)
    }

    pub fn get(&self, key: &VideoKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn path(&self, key: &VideoKey) -> Option<&Path> {
        self.entries.get(key).map(|e| e.path.as_path())
    }

    pub fn contains(&self, key: &VideoKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Indexed videos in ascending key order.
    pub fn keys(&self) -> impl Iterator<Item = &VideoKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VideoKey, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inner join with a set of detected videos, in ascending key order.
    pub fn join<'a>(&'a self, keys: &BTreeSet<VideoKey>) -> Vec<EvaluableVideo<'a>> {
        keys.iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|entry| EvaluableVideo { key: *key, entry })
            })
            .collect()
    }
}
