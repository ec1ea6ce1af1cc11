use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{fs, process::Command, sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    cache::{get_analysis_path, get_temp_audio_path},
    config::{AppConfig, DetectionConfig},
    error::{ApplauseError, Result},
    segmenter::synthesize,
    transitions::parse_silence_output,
    types::VideoAnalysis,
};

/// Extract a mono 44.1 kHz PCM track from a video using ffmpeg
pub async fn extract_audio(ffmpeg_bin: &str, video_path: &Path, audio_path: &Path) -> Result<()> {
    let output = Command::new(ffmpeg_bin)
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("44100")
        .arg("-ac")
        .arg("1")
        .arg(audio_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ApplauseError::AudioExtractionFailed {
            video_path: video_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// Run silencedetect over an audio file and return ffmpeg's diagnostic output
pub async fn detect_silence(
    config: &AppConfig,
    video_path: &Path,
    audio_path: &Path,
) -> Result<String> {
    let filter = format!(
        "silencedetect=noise={}dB:d={}",
        config.silence_noise_db, config.silence_min_gap
    );
    let output = Command::new(&config.ffmpeg_bin)
        .arg("-i")
        .arg(audio_path)
        .arg("-af")
        .arg(filter)
        .arg("-f")
        .arg("null")
        .arg("-")
        .output()
        .await?;

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !output.status.success() {
        return Err(ApplauseError::DetectionFailed {
            video_path: video_path.to_path_buf(),
            reason: stderr,
        });
    }

    Ok(stderr)
}

/// Load an analysis record from disk
pub async fn load_analysis(path: &Path) -> Result<VideoAnalysis> {
    let json_content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApplauseError::AnalysisNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let analysis: VideoAnalysis = serde_json::from_str(&json_content)?;
    Ok(analysis)
}

/// Save an analysis record. The previous record stays intact if the write fails.
pub async fn save_analysis(analysis: &VideoAnalysis, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(analysis)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &pretty_json).await?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}

#[derive(Debug)]
pub struct AnalysisRun {
    pub analysis: VideoAnalysis,
    pub record_path: PathBuf,
    /// The record already existed and detection was skipped
    pub cached: bool,
}

async fn detect_segments(
    video_path: &Path,
    config: &AppConfig,
    detection: &DetectionConfig,
) -> Result<VideoAnalysis> {
    let audio_path = get_temp_audio_path(video_path);
    if let Some(parent) = audio_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let detected = async {
        extract_audio(&config.ffmpeg_bin, video_path, &audio_path).await?;
        detect_silence(config, video_path, &audio_path).await
    }
    .await;

    if let Err(e) = fs::remove_file(&audio_path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        debug!(path = %audio_path.display(), error = %e, "failed to remove temp audio");
    }

    let points = parse_silence_output(&detected?);
    let segments = synthesize(&points, &detection.detection_policy());
    let filename = video_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(VideoAnalysis::new(filename, segments))
}

/// Analyze one video and store its record next to it.
/// An existing record is reused unless `force` is set.
#[instrument(skip_all, fields(file = %video_path.display(), operation = "analyze", force = force))]
pub async fn analyze_video(
    video_path: &Path,
    config: &AppConfig,
    detection: &DetectionConfig,
    force: bool,
) -> Result<AnalysisRun> {
    let record_path = get_analysis_path(video_path);

    if !force && record_path.exists() {
        match load_analysis(&record_path).await {
            Ok(analysis) => {
                debug!(record = %record_path.display(), "reusing analysis record");
                return Ok(AnalysisRun {
                    analysis,
                    record_path,
                    cached: true,
                });
            }
            Err(e) => warn!(error = %e, "unreadable analysis record, analyzing again"),
        }
    }

    let analysis = detect_segments(video_path, config, detection).await?;
    save_analysis(&analysis, &record_path).await?;
    info!(segments = analysis.segments.len(), "analysis saved");

    Ok(AnalysisRun {
        analysis,
        record_path,
        cached: false,
    })
}

#[derive(Debug)]
pub struct VideoOutcome {
    pub video_path: PathBuf,
    pub result: Result<AnalysisRun>,
}

/// Analyze many videos, at most `config.analysis_concurrency` at a time.
///
/// Outcomes come back in input order. `on_finished` sees each outcome as soon as
/// its video is done. One failing video never stops the others.
pub async fn analyze_videos<F>(
    videos: Vec<PathBuf>,
    config: Arc<AppConfig>,
    detection: DetectionConfig,
    force: bool,
    mut on_finished: F,
) -> Vec<VideoOutcome>
where
    F: FnMut(&VideoOutcome),
{
    let semaphore = Arc::new(Semaphore::new(config.analysis_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, video_path) in videos.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => analyze_video(&video_path, &config, &detection, force).await,
                Err(e) => Err(ApplauseError::Io(std::io::Error::other(e))),
            };
            (index, VideoOutcome { video_path, result })
        });
    }

    let mut slots: Vec<Option<VideoOutcome>> = (0..videos.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                if let Err(e) = &outcome.result {
                    error!(file = %outcome.video_path.display(), error = %e, "analysis failed");
                }
                on_finished(&outcome);
                slots[index] = Some(outcome);
            }
            Err(e) => error!(error = %e, "analysis task aborted"),
        }
    }

    videos
        .into_iter()
        .zip(slots)
        .map(|(video_path, slot)| {
            slot.unwrap_or_else(|| VideoOutcome {
                video_path,
                result: Err(ApplauseError::Io(std::io::Error::other(
                    "analysis task aborted",
                ))),
            })
        })
        .collect()
}
