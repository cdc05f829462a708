//! jamcam-eval: score traffic-camera vehicle detections against ground truth.
//!
//! A chunk of annotated videos is evaluated two ways. The video-level
//! evaluation compares the detector's per-class vehicle counts with the
//! annotated counts. The frame-level evaluation matches individual boxes by
//! IoU and reports per-class average precision and mAP.
//!
//! # Modules
//!
//! - [`ir`]: Video keys, annotations, detection tables, and their file formats
//! - [`index`]: The annotation index and its join with detection tables
//! - [`chunk`]: The chunk evaluator that ties everything together
//! - [`video_level`]: Count-difference evaluation
//! - [`frame_level`]: IoU matching, AP and mAP
//! - [`config`]: Evaluation settings
//! - [`error`]: Error types for jamcam-eval operations

pub mod chunk;
pub mod config;
pub mod error;
pub mod frame_level;
pub mod index;
pub mod ir;
pub mod video_level;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use error::EvalError;

use chunk::ChunkEvaluator;
use config::EvalConfig;
use frame_level::FrameLevelReport;
use index::{collect_annotation_files, index_paths, AnnotationIndex};
use ir::io_detections_csv::{read_frame_level_csv, read_video_level_csv};
use ir::{parse_video_name, AnnotationFormat};
use video_level::{VideoLevelDiff, VideoLevelPerformance};

/// The jamcam-eval CLI application.
#[derive(Parser)]
#[command(name = "jamcam-eval")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Emit log events as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate detector output for a chunk of annotated videos.
    Evaluate(EvaluateArgs),
    /// Read annotation files and list the videos they cover.
    Index(IndexArgs),
    /// Print the video key encoded in file names.
    ParseName(ParseNameArgs),
}

/// How reports are written to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the evaluate subcommand.
#[derive(clap::Args)]
struct EvaluateArgs {
    /// Annotation files, or directories to search for `.xml` annotations.
    #[arg(long, short = 'a', required = true, num_args = 1..)]
    annotations: Vec<PathBuf>,

    /// Video-level detection CSV (one row of class counts per video).
    #[arg(long)]
    video_level: Option<PathBuf>,

    /// Frame-level detection CSV (one row per detected box).
    #[arg(long)]
    frame_level: Option<PathBuf>,

    /// YAML config file.
    #[arg(long, env = "JAMCAM_EVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Classes to evaluate, comma separated (overrides the config file).
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Video-level class column order, comma separated (overrides the config file).
    #[arg(long, value_delimiter = ',')]
    column_order: Option<Vec<String>>,

    /// Minimum IoU for a detection to match an annotation (overrides the config file).
    #[arg(long)]
    iou_threshold: Option<f64>,

    /// Output format for the reports.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the index subcommand.
#[derive(clap::Args)]
struct IndexArgs {
    /// Annotation files, or directories to search for `.xml` annotations.
    #[arg(required = true, num_args = 1..)]
    annotations: Vec<PathBuf>,

    /// YAML config file (only its annotation options are used).
    #[arg(long, env = "JAMCAM_EVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format for the listing.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the parse-name subcommand.
#[derive(clap::Args)]
struct ParseNameArgs {
    /// File names or paths, e.g. `2021-01-01_08-00-00_00001.mp4`.
    #[arg(required = true, num_args = 1..)]
    names: Vec<String>,
}

/// Run the jamcam-eval CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), EvalError> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Some(Commands::Evaluate(args)) => run_evaluate(args),
        Some(Commands::Index(args)) => run_index(args),
        Some(Commands::ParseName(args)) => run_parse_name(args),
        None => {
            println!("jamcam-eval {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Evaluate traffic-camera vehicle detections against annotated ground truth.");
            println!();
            println!("Run 'jamcam-eval --help' for usage information.");
            Ok(())
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing(json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jamcam_eval=info"));
    let registry = tracing_subscriber::registry().with(filter);

    // A subscriber may already be installed when run() is called in-process.
    let _ = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
}

fn load_config(path: Option<&PathBuf>) -> Result<EvalConfig, EvalError> {
    match path {
        Some(path) => {
            let config = EvalConfig::load(path)?;
            tracing::debug!(path = %path.display(), "config loaded");
            Ok(config)
        }
        None => Ok(EvalConfig::default()),
    }
}

fn load_index(inputs: &[PathBuf], config: &EvalConfig) -> Result<AnnotationIndex, EvalError> {
    let files = collect_annotation_files(inputs)?;
    tracing::info!(files = files.len(), "annotation files collected");
    AnnotationIndex::load(&files, &config.annotations)
}

/// `"car, bus"` splits into `["car", " bus"]`; strip the padding and drop
/// empty entries.
fn trimmed(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Reports produced by one `evaluate` run.
#[derive(Serialize)]
struct EvaluationOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    video_level: Option<VideoLevelOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_level: Option<FrameLevelReport>,
}

#[derive(Serialize)]
struct VideoLevelOutput {
    performance: VideoLevelPerformance,
    diff: VideoLevelDiff,
}

/// Execute the evaluate subcommand.
fn run_evaluate(args: EvaluateArgs) -> Result<(), EvalError> {
    if args.video_level.is_none() && args.frame_level.is_none() {
        return Err(EvalError::NoDetectionTables);
    }

    let mut config = load_config(args.config.as_ref())?;
    if let Some(labels) = args.labels {
        config.selected_labels = trimmed(labels);
    }
    if let Some(column_order) = args.column_order {
        config.video_level_column_order = trimmed(column_order);
    }
    if let Some(iou_threshold) = args.iou_threshold {
        config.iou_threshold = iou_threshold;
    }
    config.validate()?;

    let index = load_index(&args.annotations, &config)?;

    let video_table = args
        .video_level
        .as_deref()
        .map(read_video_level_csv)
        .transpose()?;
    let frame_table = args
        .frame_level
        .as_deref()
        .map(read_frame_level_csv)
        .transpose()?;

    let mut chunk = ChunkEvaluator::new(&index, config.selected_label_set());
    if let Some(table) = &video_table {
        chunk = chunk.with_video_level(table, config.video_level_column_order.clone())?;
    }
    if let Some(table) = &frame_table {
        chunk = chunk.with_frame_level(table)?;
    }

    let video_level = if video_table.is_some() {
        let (performance, diff) = chunk.evaluate_video_level()?;
        Some(VideoLevelOutput { performance, diff })
    } else {
        None
    };
    let frame_level = if frame_table.is_some() {
        Some(chunk.evaluate_frame_level(&config.frame_level_options())?)
    } else {
        None
    };

    let output = EvaluationOutput {
        video_level,
        frame_level,
    };

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            if let Some(video) = &output.video_level {
                print!("{}", video.performance);
                println!();
                print!("{}", video.diff);
            }
            if let Some(frame) = &output.frame_level {
                if output.video_level.is_some() {
                    println!();
                }
                print!("{}", frame);
            }
        }
    }

    Ok(())
}

/// One row of the `index` listing. Videos whose file could not be read are
/// listed with `loaded: false`.
#[derive(Serialize)]
struct IndexRow {
    camera_id: u32,
    upload_timestamp: String,
    loaded: bool,
    format: Option<AnnotationFormat>,
    boxes: usize,
    path: PathBuf,
}

/// Execute the index subcommand.
fn run_index(args: IndexArgs) -> Result<(), EvalError> {
    let config = load_config(args.config.as_ref())?;
    let files = collect_annotation_files(&args.annotations)?;
    let named = index_paths(&files)?;
    let index = AnnotationIndex::load(&files, &config.annotations)?;

    let rows: Vec<IndexRow> = named
        .into_iter()
        .map(|(key, path)| {
            let entry = index.get(&key);
            IndexRow {
                camera_id: key.camera_id.as_u32(),
                upload_timestamp: key.upload_timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                loaded: entry.is_some(),
                format: entry.and_then(|e| e.format),
                boxes: entry.map_or(0, |e| e.annotation.boxes.len()),
                path: entry.map_or(path, |e| e.path.clone()),
            }
        })
        .collect();

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            let unreadable = rows.iter().filter(|row| !row.loaded).count();
            if unreadable == 0 {
                println!("{} annotated video(s)", rows.len());
            } else {
                println!(
                    "{} annotated video(s), {unreadable} unreadable",
                    rows.len() - unreadable
                );
            }
            for row in &rows {
                let format = row.format.map_or_else(|| "-".to_string(), |f| f.to_string());
                println!(
                    "  {:>6}  {}  {:<6} {:>6} box(es)  {}",
                    row.camera_id,
                    row.upload_timestamp,
                    format,
                    row.boxes,
                    row.path.display()
                );
            }
        }
    }

    Ok(())
}

/// Execute the parse-name subcommand.
fn run_parse_name(args: ParseNameArgs) -> Result<(), EvalError> {
    for name in &args.names {
        let key = parse_video_name(name)?;
        println!(
            "{}\tcamera_id={}\tuploaded={}\tstem={}",
            name,
            key.camera_id.as_u32(),
            key.upload_timestamp.format("%Y-%m-%d %H:%M:%S"),
            key.file_stem()
        );
    }
    Ok(())
}
