//! Runtime configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    segmenter::{DensityParams, DetectionPolicy},
    sensitivity::{DEFAULT_SENSITIVITY, map_sensitivity},
};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the source videos, analysis records and session file
    pub work_dir: PathBuf,
    /// Subdirectory of `work_dir` receiving extracted clips
    pub output_dir_name: String,
    /// File name of the generated trim script inside the output directory
    pub script_name: String,
    /// ffmpeg executable
    pub ffmpeg_bin: String,
    /// silencedetect noise floor in dB
    pub silence_noise_db: f64,
    /// silencedetect minimum silence length in seconds
    pub silence_min_gap: f64,
    /// Videos analyzed at the same time
    pub analysis_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            output_dir_name: "extracted".to_string(),
            script_name: "extract_videos.sh".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            silence_noise_db: -30.0,
            silence_min_gap: 0.1,
            analysis_concurrency: 2,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("APPLAUSE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir_name: env_or("APPLAUSE_OUTPUT_DIR", defaults.output_dir_name),
            script_name: env_or("APPLAUSE_SCRIPT_NAME", defaults.script_name),
            ffmpeg_bin: env_or("APPLAUSE_FFMPEG", defaults.ffmpeg_bin),
            silence_noise_db: env_or("APPLAUSE_SILENCE_NOISE_DB", defaults.silence_noise_db),
            silence_min_gap: env_or("APPLAUSE_SILENCE_MIN_GAP", defaults.silence_min_gap),
            analysis_concurrency: env_or(
                "APPLAUSE_ANALYSIS_CONCURRENCY",
                defaults.analysis_concurrency,
            )
            .max(1),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join(&self.output_dir_name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Synthetic feature frames, applause ratio >= 0.6
    #[default]
    Ratio,
    /// Duration plus volume-change density
    Density,
}

/// The recognized options of an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    pub sensitivity: u8,
    pub min_duration: Option<f64>,
    pub policy: PolicyKind,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            min_duration: None,
            policy: PolicyKind::Ratio,
        }
    }
}

impl DetectionConfig {
    pub fn detection_policy(&self) -> DetectionPolicy {
        match self.policy {
            PolicyKind::Ratio => {
                let mut params = map_sensitivity(self.sensitivity);
                if let Some(min_duration) = self.min_duration {
                    params.min_duration = min_duration;
                }
                DetectionPolicy::Ratio(params)
            }
            PolicyKind::Density => {
                let defaults = DensityParams::default();
                DetectionPolicy::Density(DensityParams {
                    min_duration: self.min_duration.unwrap_or(defaults.min_duration),
                    ..defaults
                })
            }
        }
    }
}
