use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use subject_reframe_core::detection::domain::subject_override::OverrideSet;
use subject_reframe_core::detection::infrastructure::detector_factory::{
    DetectorFactory, DetectorSettings,
};
use subject_reframe_core::detection::infrastructure::onnx_yolo_detector::{
    DEFAULT_CLASS_ID, DEFAULT_CONFIDENCE,
};
use subject_reframe_core::framing::domain::aspect_preset::AspectPreset;
use subject_reframe_core::pipeline::batch_reframe_use_case::{
    BatchReframeUseCase, JobResult, ReframeJob,
};
use subject_reframe_core::pipeline::infrastructure::ffmpeg_run_factory::FfmpegRunFactory;
use subject_reframe_core::pipeline::reframe_options::ReframeOptions;
use subject_reframe_core::shared::constants::{
    DEFAULT_DETECT_EVERY, DEFAULT_EMA_ALPHA, DEFAULT_PAN_CAP_PX, VIDEO_EXTENSIONS,
};
use subject_reframe_core::shared::model_resolver::ModelResolver;
use subject_reframe_core::video::infrastructure::ffmpeg_writer::DEFAULT_BIT_RATE;

/// Reframe videos to vertical, square and landscape formats, keeping the
/// main subject in shot.
#[derive(Parser)]
#[command(name = "reframe")]
struct Cli {
    /// Input video file, or a directory of videos.
    input: PathBuf,

    /// Output directory. Each ratio gets its own subdirectory.
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Target ratios, comma-separated (9x16, 1x1, 16x9).
    #[arg(long, value_delimiter = ',', default_value = "9x16,1x1,16x9")]
    ratios: Vec<AspectPreset>,

    /// Run the detector every Nth frame; the tracker covers the rest.
    #[arg(long, default_value_t = DEFAULT_DETECT_EVERY)]
    detect_every: usize,

    /// Smoothing weight of the newest subject position (0.0-1.0].
    #[arg(long, default_value_t = DEFAULT_EMA_ALPHA)]
    ema_alpha: f64,

    /// Maximum camera movement per frame in pixels (0 disables the cap).
    #[arg(long, default_value_t = DEFAULT_PAN_CAP_PX)]
    pan_cap_px: f64,

    /// Detector ONNX model. Downloaded to the cache directory when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Model class index treated as the subject.
    #[arg(long, default_value_t = DEFAULT_CLASS_ID)]
    class_id: usize,

    /// JSON file of per-video overrides:
    /// {"clip.mp4": {"manual_center": [x, y]}} or {"clip.mp4": {"box": [x, y, w, h]}}.
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Number of videos/ratios processed in parallel.
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Output video bit rate in bits per second.
    #[arg(long, default_value_t = DEFAULT_BIT_RATE)]
    bit_rate: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let tuning = ReframeOptions {
        detect_every: cli.detect_every,
        ema_alpha: cli.ema_alpha,
        pan_cap_px: cli.pan_cap_px,
        ..ReframeOptions::default()
    };
    tuning.validate()?;

    let sources = collect_sources(&cli.input)?;
    if sources.is_empty() {
        return Err(format!("No videos found in {}", cli.input.display()).into());
    }

    let overrides = match &cli.overrides {
        Some(path) => {
            let set = OverrideSet::load(path)?;
            log::info!("Loaded {} override(s) from {}", set.len(), path.display());
            set
        }
        None => OverrideSet::default(),
    };

    let settings = DetectorSettings {
        model_path: cli.model.clone(),
        confidence: cli.confidence,
        class_id: cli.class_id,
    };
    let resolver = ModelResolver::new()?;
    let detectors =
        DetectorFactory::resolve(&settings, &resolver, Some(Box::new(download_progress)))?;
    eprintln!();

    let ratios = dedup_ratios(&cli.ratios);
    let jobs = plan_jobs(&sources, &ratios, &cli.output, &overrides);
    let total = jobs.len();

    let factory = FfmpegRunFactory::new(detectors, tuning).with_bit_rate(cli.bit_rate);
    let batch = BatchReframeUseCase::new(Box::new(factory), cli.jobs);
    let results = batch.execute(jobs);

    let failed = report(&results);
    if failed > 0 {
        return Err(format!("{failed} of {total} job(s) failed").into());
    }
    log::info!("All {total} output(s) written to {}", cli.output.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if cli.ratios.is_empty() {
        return Err("At least one ratio is required".into());
    }
    if cli.jobs == 0 {
        return Err("--jobs must be at least 1".into());
    }
    if cli.bit_rate == 0 {
        return Err("--bit-rate must be positive".into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(overrides) = &cli.overrides {
        if !overrides.is_file() {
            return Err(format!("Overrides file not found: {}", overrides.display()).into());
        }
    }
    Ok(())
}

/// A single file as-is, or the videos directly inside a directory, sorted.
fn collect_sources(input: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && is_video(&path) {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn dedup_ratios(ratios: &[AspectPreset]) -> Vec<AspectPreset> {
    let mut unique = Vec::new();
    for ratio in ratios {
        if !unique.contains(ratio) {
            unique.push(*ratio);
        }
    }
    unique
}

/// `<output>/<ratio>/<stem>_tracked_<ratio>.mp4`
fn output_path(output: &Path, source: &Path, ratio: AspectPreset) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    output
        .join(ratio.key())
        .join(format!("{stem}_tracked_{}.mp4", ratio.key()))
}

/// One job per source and ratio, sources outermost.
fn plan_jobs(
    sources: &[PathBuf],
    ratios: &[AspectPreset],
    output: &Path,
    overrides: &OverrideSet,
) -> Vec<ReframeJob> {
    let mut jobs = Vec::with_capacity(sources.len() * ratios.len());
    for source in sources {
        let subject_override = overrides.for_source(source);
        for &ratio in ratios {
            let (target_width, target_height) = ratio.dimensions();
            jobs.push(ReframeJob {
                source: source.clone(),
                destination: output_path(output, source, ratio),
                target_width,
                target_height,
                subject_override,
            });
        }
    }
    jobs
}

/// Prints one line per job and returns the number of failures.
fn report(results: &[JobResult]) -> usize {
    let mut failed = 0;
    for result in results {
        match &result.outcome {
            Ok(report) => eprintln!(
                "ok    {} -> {} ({} frames, {} detector calls, audio {:?})",
                result.job.source.display(),
                result.job.destination.display(),
                report.frames_written,
                report.detector_calls,
                report.audio
            ),
            Err(e) => {
                failed += 1;
                eprintln!("FAIL  {}: {e}", result.job.label());
            }
        }
    }
    failed
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
