use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

use applause_core::{
    AppConfig, DetectionConfig, ExecuteOptions, ExtractionPlanItem, FfmpegTrimmer, ItemOutcome, MeetingState,
    PolicyKind, VideoAnalysis, analyze_videos, build_plan, execute_plan, find_analyses,
    find_videos, format_analysis_summary, format_plan_preview, get_analysis_path,
    get_session_path, load_analysis, parse_timestamp, save_analysis,
    sensitivity::{DEFAULT_SENSITIVITY, MAX_SENSITIVITY, MIN_SENSITIVITY},
    write_script,
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for PolicyKind (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliPolicy {
    #[default]
    Ratio,
    Density,
}

impl From<CliPolicy> for PolicyKind {
    fn from(cli: CliPolicy) -> Self {
        match cli {
            CliPolicy::Ratio => PolicyKind::Ratio,
            CliPolicy::Density => PolicyKind::Density,
        }
    }
}

#[derive(Parser)]
#[command(name = "applause")]
#[command(about = "Detect applause in meeting recordings and split them into per-speaker clips")]
struct Cli {
    /// Directory with the videos, analysis records and session file
    #[arg(short = 'C', long, global = true)]
    dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect applause segments and write one analysis record per video
    Analyze(AnalyzeArgs),
    /// Show every analysis record in the directory
    List,
    /// Change selection, tags or bounds of one segment
    Edit(EditArgs),
    /// Presenters, toastmaster and roster
    #[command(subcommand)]
    Session(SessionCommand),
    /// Preview the clips that `split` would extract
    Plan,
    /// Extract the planned clips with ffmpeg
    Split(SplitArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Videos to analyze. Defaults to every video in the directory
    videos: Vec<PathBuf>,

    /// Detection sensitivity, higher finds more applause
    #[arg(short, long, default_value_t = DEFAULT_SENSITIVITY,
        value_parser = clap::value_parser!(u8).range(i64::from(MIN_SENSITIVITY)..=i64::from(MAX_SENSITIVITY)))]
    sensitivity: u8,

    /// Minimum applause length in seconds, overriding the sensitivity default
    #[arg(short, long)]
    min_duration: Option<f64>,

    /// Accept policy for candidate segments
    #[arg(short, long, value_enum, default_value = "ratio")]
    policy: CliPolicy,

    /// Re-analyze even if an analysis record exists
    #[arg(short, long)]
    force: bool,
}

#[derive(Args)]
struct EditArgs {
    /// Video whose analysis record is edited
    video: PathBuf,

    /// Segment number as shown by `list` (1-based)
    index: usize,

    /// Include the segment in the split
    #[arg(long, conflicts_with = "deselect")]
    select: bool,

    /// Leave the segment out of the split
    #[arg(long)]
    deselect: bool,

    /// Add a tag; prefix with "custom:" for names not on the roster
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Remove a tag
    #[arg(long = "untag", value_name = "TAG")]
    untags: Vec<String>,

    /// New start time (MM:SS)
    #[arg(long, value_name = "MM:SS")]
    start: Option<String>,

    /// New end time (MM:SS)
    #[arg(long, value_name = "MM:SS")]
    end: Option<String>,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Name the presenter of a video's lead-in clip (empty name clears it)
    Presenter { video: String, name: String },
    /// Set the toastmaster (empty name clears it)
    Toastmaster {
        name: String,
        /// Tag every detected segment with the toastmaster
        #[arg(long)]
        apply: bool,
    },
    /// Set the presenter roster from a comma-separated list
    Roster { names: String },
    /// Print the session
    Show,
}

#[derive(Args)]
struct SplitArgs {
    /// Only write the trim script
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

fn init_tracing(verbose: u8) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "applause={default_level},applause_core={default_level}"
        ))
    });

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn create_progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn header(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("applause").cyan().bold(),
        style(subtitle).dim()
    );
}

fn resolve(work_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        work_dir.join(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn load_all_analyses(work_dir: &Path) -> Result<Vec<(PathBuf, VideoAnalysis)>> {
    let paths = find_analyses(work_dir)
        .with_context(|| format!("failed to read directory {}", work_dir.display()))?;

    let mut analyses = Vec::with_capacity(paths.len());
    for path in paths {
        match load_analysis(&path).await {
            Ok(analysis) => analyses.push((path, analysis)),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable analysis record");
                eprintln!(
                    "{} skipping {}: {}",
                    style("!").yellow().bold(),
                    file_name(&path),
                    e
                );
            }
        }
    }
    Ok(analyses)
}

async fn run_analyze(config: AppConfig, args: AnalyzeArgs) -> Result<()> {
    header("Applause Detection");

    let videos = if args.videos.is_empty() {
        find_videos(&config.work_dir)
            .with_context(|| format!("failed to read directory {}", config.work_dir.display()))?
    } else {
        args.videos
            .iter()
            .map(|video| resolve(&config.work_dir, video))
            .collect()
    };

    if videos.is_empty() {
        println!("{} No video files found", style("!").yellow().bold());
        return Ok(());
    }

    let detection = DetectionConfig {
        sensitivity: args.sensitivity,
        min_duration: args.min_duration,
        policy: args.policy.into(),
    };
    info!(?detection, videos = videos.len(), "starting analysis");

    let started = Instant::now();
    let spinner = create_spinner(&format!("Analyzing {} video(s)...", videos.len()))?;
    let outcomes = analyze_videos(
        videos,
        Arc::new(config),
        detection,
        args.force,
        |outcome| {
            let name = file_name(&outcome.video_path);
            let line = match &outcome.result {
                Ok(run) if run.cached => format!(
                    "{} {} {}",
                    style("✓").green().bold(),
                    name,
                    style("(cached)").dim()
                ),
                Ok(run) => format!(
                    "{} {}: {} segment(s)",
                    style("✓").green().bold(),
                    name,
                    run.analysis.segments.len()
                ),
                Err(e) => format!("{} {}: {}", style("✗").red().bold(), name, e),
            };
            spinner.println(line);
        },
    )
    .await;
    spinner.finish_and_clear();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    println!(
        "\n{} {} analyzed, {} failed in {}\n",
        style("Done:").dim(),
        outcomes.len() - failed,
        failed,
        format_duration(started.elapsed())
    );

    for outcome in &outcomes {
        if let Ok(run) = &outcome.result {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_analysis_summary(&run.analysis));
            println!(
                "{} {}\n",
                style("Saved:").dim(),
                style(run.record_path.display()).cyan()
            );
        }
    }

    if failed > 0 {
        bail!("{failed} video(s) could not be analyzed");
    }
    Ok(())
}

async fn run_list(config: &AppConfig) -> Result<()> {
    let analyses = load_all_analyses(&config.work_dir).await?;
    if analyses.is_empty() {
        println!("No analysis records found. Run `applause analyze` first.");
        return Ok(());
    }

    for (_, analysis) in &analyses {
        println!("{}", format_analysis_summary(analysis));
    }
    Ok(())
}

async fn run_edit(config: &AppConfig, args: EditArgs) -> Result<()> {
    let video_path = resolve(&config.work_dir, &args.video);
    let record_path = get_analysis_path(&video_path);
    let session = MeetingState::load(&get_session_path(&config.work_dir)).await?;

    let mut analysis = load_analysis(&record_path)
        .await
        .with_context(|| format!("no analysis for {}", video_path.display()))?;
    let segment = analysis.segment_mut(args.index)?;

    if args.select {
        segment.selected = true;
    }
    if args.deselect {
        segment.selected = false;
    }
    for tag in &args.tags {
        if !session.check_roster(tag) {
            eprintln!(
                "{} {} is not on the roster",
                style("!").yellow().bold(),
                style(tag).yellow()
            );
        }
        segment.add_tag(tag);
    }
    for tag in &args.untags {
        if !segment.remove_tag(tag) {
            eprintln!("{} segment has no tag {}", style("!").yellow().bold(), tag);
        }
    }
    if args.start.is_some() || args.end.is_some() {
        let start = match &args.start {
            Some(value) => parse_timestamp(value)?,
            None => segment.start_seconds()?,
        };
        let end = match &args.end {
            Some(value) => parse_timestamp(value)?,
            None => segment.end_seconds()?,
        };
        segment.set_bounds(start, end)?;
    }

    save_analysis(&analysis, &record_path).await?;
    info!(file = %analysis.filename, index = args.index, "segment updated");

    println!("{}", format_analysis_summary(&analysis));
    Ok(())
}

async fn run_session(config: &AppConfig, command: SessionCommand) -> Result<()> {
    let session_path = get_session_path(&config.work_dir);
    let mut session = MeetingState::load(&session_path)
        .await
        .with_context(|| format!("failed to read {}", session_path.display()))?;

    match command {
        SessionCommand::Presenter { video, name } => {
            let filename = file_name(Path::new(&video));
            session.set_default_presenter(&filename, &name);
        }
        SessionCommand::Toastmaster { name, apply } => {
            session.set_toastmaster(&name);
            if apply {
                let records = load_all_analyses(&config.work_dir).await?;
                let mut analyses: Vec<VideoAnalysis> =
                    records.iter().map(|(_, a)| a.clone()).collect();
                let added = session.apply_toastmaster(&mut analyses);

                for ((path, before), after) in records.iter().zip(analyses) {
                    if *before != after {
                        save_analysis(&after, path).await?;
                    }
                }
                println!(
                    "{} Tagged {} segment(s) with the toastmaster",
                    style("✓").green().bold(),
                    added
                );
            }
        }
        SessionCommand::Roster { names } => session.set_roster(&names),
        SessionCommand::Show => {}
    }

    session.save(&session_path).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

async fn current_plan(config: &AppConfig) -> Result<Vec<ExtractionPlanItem>> {
    let session = MeetingState::load(&get_session_path(&config.work_dir)).await?;
    let analyses: Vec<VideoAnalysis> = load_all_analyses(&config.work_dir)
        .await?
        .into_iter()
        .map(|(_, analysis)| analysis)
        .collect();
    Ok(build_plan(&analyses, &session.plan_context()))
}

async fn run_plan(config: &AppConfig) -> Result<()> {
    let plan = current_plan(config).await?;
    if plan.is_empty() {
        println!("Nothing to do: no selected applause segments.");
        return Ok(());
    }
    print!("{}", format_plan_preview(&plan));
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stdout();
    term.write_str(&format!("{prompt} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn run_split(config: &AppConfig, args: SplitArgs) -> Result<()> {
    header("Clip Extraction");

    let plan = current_plan(config).await?;
    if plan.is_empty() {
        println!("Nothing to do: no selected applause segments.");
        return Ok(());
    }
    println!("{}", format_plan_preview(&plan));

    let options = ExecuteOptions {
        source_dir: config.work_dir.clone(),
        output_dir: config.output_dir(),
        script_name: config.script_name.clone(),
        ffmpeg_bin: config.ffmpeg_bin.clone(),
    };

    if args.dry_run {
        let script_path = write_script(&plan, &options, Uuid::new_v4()).await?;
        println!(
            "{} {}",
            style("Script:").dim(),
            style(script_path.display()).cyan()
        );
        return Ok(());
    }

    if !args.yes && !confirm(&format!("Extract {} clip(s)?", plan.len()))? {
        println!("Aborted.");
        return Ok(());
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current clip");
            let _ = cancel_tx.send(true);
        }
    });

    let started = Instant::now();
    let bar = create_progress_bar(plan.len())?;
    let trimmer = FfmpegTrimmer::new(config.ffmpeg_bin.clone());
    let report = execute_plan(&plan, &trimmer, &options, cancel_rx, |progress| {
        match &progress.outcome {
            ItemOutcome::Completed => bar.println(format!(
                "{} {}",
                style("✓").green().bold(),
                progress.output_name
            )),
            ItemOutcome::Failed(e) => bar.println(format!(
                "{} {}: {}",
                style("✗").red().bold(),
                progress.output_name,
                e.lines().next().unwrap_or_default()
            )),
        }
        bar.set_message(progress.output_name.clone());
        bar.set_position(progress.index as u64);
    })
    .await?;
    bar.finish_and_clear();

    println!(
        "\n{} {} extracted, {} failed in {}",
        style("Done:").dim(),
        report.completed.len(),
        report.failed.len(),
        format_duration(started.elapsed())
    );
    if report.cancelled {
        println!("{} Cancelled before all clips were extracted", style("!").yellow().bold());
    }
    println!(
        "{} {}  {}\n",
        style("Output:").dim(),
        style(config.output_dir().display()).cyan(),
        style(format!("batch {}", report.batch_id)).dim()
    );

    if !report.failed.is_empty() {
        bail!("{} clip(s) failed", report.failed.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.dir {
        config = config.with_work_dir(dir);
    }

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(config, args).await,
        Command::List => run_list(&config).await,
        Command::Edit(args) => run_edit(&config, args).await,
        Command::Session(command) => run_session(&config, command).await,
        Command::Plan => run_plan(&config).await,
        Command::Split(args) => run_split(&config, args).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
