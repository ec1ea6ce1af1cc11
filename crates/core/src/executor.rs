use std::path::{Path, PathBuf};

use tokio::{fs, process::Command, sync::watch};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{ApplauseError, Result},
    script::{render_trim_script, trim_args},
    types::ExtractionPlanItem,
};

/// Cuts one clip out of a source video.
pub trait Trimmer {
    async fn trim(&self, source: &Path, start: f64, duration: f64, output: &Path) -> Result<()>;
}

/// Stream-copy trim through the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegTrimmer {
    ffmpeg_bin: String,
}

impl FfmpegTrimmer {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }
}

impl Default for FfmpegTrimmer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Trimmer for FfmpegTrimmer {
    async fn trim(&self, source: &Path, start: f64, duration: f64, output: &Path) -> Result<()> {
        let output_result = Command::new(&self.ffmpeg_bin)
            .args(trim_args(source, start, duration, output))
            .output()
            .await?;

        if !output_result.status.success() {
            return Err(ApplauseError::TrimFailed {
                source_path: source.to_path_buf(),
                output_path: output.to_path_buf(),
                reason: String::from_utf8_lossy(&output_result.stderr).to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Directory holding the source videos named in the plan
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub script_name: String,
    /// ffmpeg executable written into the script
    pub ffmpeg_bin: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Completed,
    Failed(String),
}

/// Emitted after each plan item finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionProgress {
    /// 1-based position in the plan
    pub index: usize,
    pub total: usize,
    pub output_name: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub output_name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub batch_id: Uuid,
    pub completed: Vec<String>,
    pub failed: Vec<ItemFailure>,
    pub cancelled: bool,
    pub script_path: PathBuf,
}

/// Write the trim script for `plan`, replacing any previous one.
pub async fn write_script(
    plan: &[ExtractionPlanItem],
    options: &ExecuteOptions,
    batch_id: Uuid,
) -> Result<PathBuf> {
    fs::create_dir_all(&options.output_dir).await?;

    let script = render_trim_script(
        plan,
        &options.source_dir,
        &options.output_dir,
        &options.ffmpeg_bin,
        batch_id,
    );
    let script_path = options.output_dir.join(&options.script_name);
    fs::write(&script_path, script).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(script_path)
}

/// Run the plan item by item. A failed trim is recorded and the run continues;
/// a set cancel flag stops it before the next item.
#[instrument(skip_all, fields(operation = "extract", batch_id = tracing::field::Empty))]
pub async fn execute_plan<T, F>(
    plan: &[ExtractionPlanItem],
    trimmer: &T,
    options: &ExecuteOptions,
    cancel: watch::Receiver<bool>,
    mut on_progress: F,
) -> Result<ExtractionReport>
where
    T: Trimmer,
    F: FnMut(ExtractionProgress),
{
    let batch_id = Uuid::new_v4();
    tracing::Span::current().record("batch_id", tracing::field::display(batch_id));

    let script_path = write_script(plan, options, batch_id).await?;
    info!(items = plan.len(), script = %script_path.display(), "starting extraction");

    let mut report = ExtractionReport {
        batch_id,
        completed: Vec::new(),
        failed: Vec::new(),
        cancelled: false,
        script_path,
    };

    for (i, item) in plan.iter().enumerate() {
        if *cancel.borrow() {
            warn!(remaining = plan.len() - i, "extraction cancelled");
            report.cancelled = true;
            break;
        }

        let source = options.source_dir.join(&item.source_filename);
        let output = options.output_dir.join(&item.output_name);
        let outcome = match trimmer
            .trim(&source, item.start_time, item.duration, &output)
            .await
        {
            Ok(()) => {
                info!(file = %item.source_filename, output = %item.output_name, "clip extracted");
                report.completed.push(item.output_name.clone());
                ItemOutcome::Completed
            }
            Err(e) => {
                warn!(
                    file = %item.source_filename,
                    output = %item.output_name,
                    error = %e,
                    "clip extraction failed"
                );
                report.failed.push(ItemFailure {
                    output_name: item.output_name.clone(),
                    error: e.to_string(),
                });
                ItemOutcome::Failed(e.to_string())
            }
        };

        on_progress(ExtractionProgress {
            index: i + 1,
            total: plan.len(),
            output_name: item.output_name.clone(),
            outcome,
        });
    }

    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "extraction finished"
    );
    Ok(report)
}
