use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplauseError {
    #[error("Audio extraction failed for {video_path}: {reason}")]
    AudioExtractionFailed { video_path: PathBuf, reason: String },

    #[error("Silence detection failed for {video_path}: {reason}")]
    DetectionFailed { video_path: PathBuf, reason: String },

    #[error("Trim of {source_path} into {output_path} failed: {reason}")]
    TrimFailed {
        source_path: PathBuf,
        output_path: PathBuf,
        reason: String,
    },

    #[error("Invalid segment bounds: end {end:.2}s must be after start {start:.2}s")]
    InvalidBounds { start: f64, end: f64 },

    #[error("Invalid timestamp {0:?}, expected MM:SS")]
    InvalidTimestamp(String),

    #[error("Segment {index} not found in {filename}")]
    SegmentNotFound { filename: String, index: usize },

    #[error("No analysis record at {0}")]
    AnalysisNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApplauseError>;
