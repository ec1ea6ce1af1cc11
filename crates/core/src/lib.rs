//! Applause Core Library
//!
//! Detects applause in meeting recordings from ffmpeg silence detection,
//! keeps per-video analysis records, and plans and runs the clip extraction
//! that splits a recording into per-speaker videos.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod pipeline;
pub mod planner;
pub mod script;
pub mod segmenter;
pub mod sensitivity;
pub mod session;
pub mod transitions;
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{find_analyses, find_videos, get_analysis_path, get_session_path};
pub use config::{AppConfig, DetectionConfig, PolicyKind};
pub use error::{ApplauseError, Result};
pub use executor::{
    ExecuteOptions, ExtractionProgress, ExtractionReport, FfmpegTrimmer, ItemFailure,
    ItemOutcome, Trimmer, execute_plan, write_script,
};
pub use format::{format_analysis_summary, format_plan_preview, format_timestamp, parse_timestamp};
pub use pipeline::{AnalysisRun, VideoOutcome, analyze_video, analyze_videos, load_analysis, save_analysis};
pub use planner::{PlanContext, REST_OF_FILE_SECONDS, build_plan};
pub use segmenter::{DetectionPolicy, synthesize};
pub use sensitivity::{SensitivityParams, map_sensitivity};
pub use session::{MeetingState, parse_presenter_list};
pub use transitions::parse_silence_output;
pub use types::{ExtractionPlanItem, Segment, VideoAnalysis, VolumePoint};
