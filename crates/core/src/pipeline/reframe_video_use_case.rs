use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::subject_detector::SubjectDetector;
use crate::detection::domain::subject_locator::{Location, SubjectLocator};
use crate::detection::domain::subject_tracker::TrackerFactory;
use crate::framing::domain::area_resampler::resize_area;
use crate::framing::domain::crop_geometry::{compute_crop, CropWindow};
use crate::framing::domain::pan_rate_limiter::PanRateLimiter;
use crate::framing::domain::trajectory_smoother::TrajectorySmoother;
use crate::shared::constants::FALLBACK_FPS;
use crate::shared::point::Point;
use crate::shared::reframe_error::ReframeError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::audio_remuxer::AudioRemuxer;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::output_finalizer::{AudioOutcome, OutputFinalizer};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::reframe_options::ReframeOptions;

/// The camera decision for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePlan {
    /// Center suggested by the locator (or the frame center when lost).
    pub raw: Point,
    pub smoothed: Point,
    /// Smoothed center after the pan-rate cap; the crop is built around it.
    pub capped: Point,
    pub crop: CropWindow,
}

/// What a finished run produced.
#[derive(Clone, Debug)]
pub struct ReframeReport {
    pub frames_written: usize,
    pub detector_calls: usize,
    pub tracker_updates: usize,
    pub tracker_losses: usize,
    pub audio: AudioOutcome,
    /// Per-frame camera path; empty unless the run was built
    /// [`with_trajectory`](ReframeVideoUseCase::with_trajectory).
    pub trajectory: Vec<FramePlan>,
}

/// Reframes one video to one target size.
///
/// Frames are processed strictly in decode order on the calling thread:
/// locate → smooth → pan-cap → crop → resize → write. The silent stream goes
/// to a temporary file that is promoted (with the source audio when there is
/// any) only after the last frame is written. The use case is single-use:
/// `execute` consumes it.
pub struct ReframeVideoUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    locator: SubjectLocator,
    remuxer: Box<dyn AudioRemuxer>,
    options: ReframeOptions,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
    record_trajectory: bool,
}

impl ReframeVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn SubjectDetector>,
        tracker_factory: TrackerFactory,
        remuxer: Box<dyn AudioRemuxer>,
        options: ReframeOptions,
    ) -> Result<Self, ReframeError> {
        options.validate()?;
        let locator = SubjectLocator::new(detector, tracker_factory, options.detect_every)
            .with_override(options.subject_override);
        Ok(Self {
            reader,
            writer,
            locator,
            remuxer,
            options,
            logger: Box::new(NullPipelineLogger),
            cancelled: Arc::new(AtomicBool::new(false)),
            record_trajectory: false,
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Shares a cancel flag; a set flag stops the run at the next frame.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Keeps every [`FramePlan`] in the report. Memory grows with the
    /// length of the source.
    pub fn with_trajectory(mut self, record: bool) -> Self {
        self.record_trajectory = record;
        self
    }

    pub fn options(&self) -> &ReframeOptions {
        &self.options
    }

    pub fn execute(
        mut self,
        source: &Path,
        destination: &Path,
    ) -> Result<ReframeReport, ReframeError> {
        let metadata = self.open_source(source)?;

        let finalizer = OutputFinalizer::new(destination);
        if let Err(e) = finalizer.prepare() {
            self.reader.close();
            return Err(e);
        }

        let rendered = self.render(&metadata, finalizer.silent_path());
        self.reader.close();
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                finalizer.discard();
                return Err(e);
            }
        };

        let audio = finalizer.finalize(source, self.remuxer.as_ref())?;

        let stats = self.locator.stats();
        self.logger.metric("detector_calls", stats.detector_calls as f64);
        self.logger.metric("tracker_updates", stats.tracker_updates as f64);
        self.logger.info(&format!(
            "wrote {} ({} frames, audio {audio:?})",
            destination.display(),
            rendered.frames
        ));
        self.logger.summary();

        Ok(ReframeReport {
            frames_written: rendered.frames,
            detector_calls: stats.detector_calls,
            tracker_updates: stats.tracker_updates,
            tracker_losses: stats.tracker_losses,
            audio,
            trajectory: rendered.trajectory,
        })
    }

    fn open_source(&mut self, source: &Path) -> Result<VideoMetadata, ReframeError> {
        let unreadable = |reason: String| ReframeError::SourceUnreadable {
            path: source.to_path_buf(),
            reason,
        };

        let mut metadata = self
            .reader
            .open(source)
            .map_err(|e| unreadable(e.to_string()))?;
        if !self.reader.is_open() {
            return Err(unreadable("reader did not open".to_string()));
        }

        if !(metadata.fps.is_finite() && metadata.fps > 0.0) {
            log::warn!(
                "{} reports no frame rate, assuming {FALLBACK_FPS} fps",
                source.display()
            );
            metadata.fps = FALLBACK_FPS;
        }
        Ok(metadata)
    }

    /// Encodes every frame into `silent_path`. The writer is closed even
    /// when a frame fails so the temporary file can be removed.
    fn render(
        &mut self,
        metadata: &VideoMetadata,
        silent_path: &Path,
    ) -> Result<Rendered, ReframeError> {
        let output = metadata.resized(self.options.target_width, self.options.target_height);
        self.writer
            .open(silent_path, &output)
            .map_err(|e| ReframeError::Encode(e.to_string()))?;

        let frames = self.render_frames(metadata.total_frames);
        let closed = self
            .writer
            .close()
            .map_err(|e| ReframeError::Encode(e.to_string()));

        let rendered = frames?;
        closed?;
        if rendered.frames == 0 {
            return Err(ReframeError::Decode("source yielded no frames".to_string()));
        }
        Ok(rendered)
    }

    fn render_frames(&mut self, total: usize) -> Result<Rendered, ReframeError> {
        let (target_w, target_h) = (self.options.target_width, self.options.target_height);
        let mut camera = CameraPath::new(&self.options);
        let mut rendered = Rendered::default();
        if self.record_trajectory {
            rendered.trajectory.reserve(total);
        }

        for decoded in self.reader.frames() {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(ReframeError::Cancelled);
            }
            let frame = decoded.map_err(|e| ReframeError::Decode(e.to_string()))?;

            let started = Instant::now();
            let location = self.locator.locate(&frame)?;
            self.logger.timing("locate", elapsed_ms(started));

            let started = Instant::now();
            let plan = camera.plan(frame.width(), frame.height(), &location);
            self.logger.timing("plan", elapsed_ms(started));

            let started = Instant::now();
            let crop = plan.crop;
            let cropped = frame.region(crop.x, crop.y, crop.width, crop.height);
            self.logger.timing("crop", elapsed_ms(started));

            let started = Instant::now();
            let resized = resize_area(&cropped, target_w, target_h)
                .map_err(|e| ReframeError::Encode(format!("cannot resize frame: {e}")))?;
            self.logger.timing("resize", elapsed_ms(started));

            let started = Instant::now();
            self.writer
                .write(&resized)
                .map_err(|e| ReframeError::Encode(e.to_string()))?;
            self.logger.timing("write", elapsed_ms(started));

            rendered.frames += 1;
            if self.record_trajectory {
                rendered.trajectory.push(plan);
            }
            self.logger.progress(rendered.frames, total);
        }

        Ok(rendered)
    }
}

#[derive(Default)]
struct Rendered {
    frames: usize,
    trajectory: Vec<FramePlan>,
}

/// Smoother and pan limiter for one run, turning locations into crops.
struct CameraPath {
    smoother: TrajectorySmoother,
    limiter: PanRateLimiter,
    ratio: f64,
}

impl CameraPath {
    fn new(options: &ReframeOptions) -> Self {
        Self {
            smoother: TrajectorySmoother::new(options.ema_alpha),
            limiter: PanRateLimiter::new(options.pan_cap_px),
            ratio: options.target_ratio(),
        }
    }

    fn plan(&mut self, frame_w: u32, frame_h: u32, location: &Location) -> FramePlan {
        let raw = location.raw_center(frame_w, frame_h);
        let smoothed = self.smoother.update(raw);
        let capped = self.limiter.apply(smoothed);
        FramePlan {
            raw,
            smoothed,
            capped,
            crop: compute_crop(frame_w, frame_h, self.ratio, capped),
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::test_support::*;
    use super::*;
    use crate::detection::domain::subject_locator::test_support::{
        stub_tracker_factory, ScriptedDetector, TrackerLog,
    };
    use crate::detection::domain::subject_override::SubjectOverride;
    use crate::pipeline::output_finalizer::test_support::{StubRemuxer, MUXED_BYTES};
    use crate::shared::bounding_box::BoundingBox;

    /// Records the order in which stages are timed.
    struct StageLogger {
        stages: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for StageLogger {
        fn progress(&mut self, _current: usize, _total: usize) {}
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.stages.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    /// Sets the cancel flag once `after` frames have been reported.
    struct CancellingLogger {
        after: usize,
        flag: Arc<AtomicBool>,
    }

    impl PipelineLogger for CancellingLogger {
        fn progress(&mut self, current: usize, _total: usize) {
            if current >= self.after {
                self.flag.store(true, Ordering::Relaxed);
            }
        }
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    // --- Harness ---

    struct Probes {
        writer: Arc<Mutex<WriterLog>>,
        detector_calls: Arc<Mutex<Vec<usize>>>,
        tracker: Arc<Mutex<TrackerLog>>,
    }

    struct Setup {
        frames: usize,
        fps: f64,
        fail_open: bool,
        fail_write_at: Option<usize>,
        detector: Option<ScriptedDetector>,
        lose_after: Option<usize>,
        remuxer: StubRemuxer,
        options: ReframeOptions,
        trajectory: bool,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                frames: 10,
                fps: 30.0,
                fail_open: false,
                fail_write_at: None,
                detector: None,
                lose_after: None,
                remuxer: StubRemuxer::new(false, false),
                options: ReframeOptions {
                    detect_every: 1,
                    ..ReframeOptions::for_target(45, 80)
                },
                trajectory: true,
            }
        }
    }

    impl Setup {
        fn build(self) -> (ReframeVideoUseCase, Probes) {
            let (detector, detector_calls) = match self.detector {
                Some(detector) => {
                    let calls = detector.calls.clone();
                    (detector, calls)
                }
                None => ScriptedDetector::always(Vec::new()),
            };
            let (tracker_factory, tracker) = stub_tracker_factory(self.lose_after);
            let (writer, writer_log) = StubWriter::new(self.fail_write_at);
            let reader = StubReader {
                fps: self.fps,
                fail_open: self.fail_open,
                ..StubReader::blank(self.frames)
            };

            let use_case = ReframeVideoUseCase::new(
                Box::new(reader),
                Box::new(writer),
                Box::new(detector),
                tracker_factory,
                Box::new(self.remuxer),
                self.options,
            )
            .unwrap()
            .with_trajectory(self.trajectory);

            (
                use_case,
                Probes {
                    writer: writer_log,
                    detector_calls,
                    tracker,
                },
            )
        }
    }

    fn destination(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("9x16").join("clip_tracked_9x16.mp4")
    }

    fn centered_box() -> BoundingBox {
        BoundingBox::new(140.0, 60.0, 40.0, 40.0)
    }

    // --- Scenarios ---

    #[test]
    fn test_centered_subject_every_frame_keeps_crop_centered() {
        let dir = tempfile::tempdir().unwrap();
        let (detector, _) = ScriptedDetector::always(vec![centered_box()]);
        let (use_case, probes) = Setup {
            detector: Some(detector),
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        assert_eq!(report.frames_written, 10);
        assert_eq!(report.detector_calls, 10);
        assert_eq!(probes.detector_calls.lock().unwrap().len(), 10);
        for plan in &report.trajectory {
            assert_eq!(plan.crop.center(), Point::frame_center(W, H));
        }
    }

    #[test]
    fn test_no_detections_hold_frame_center() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, probes) = Setup {
            options: ReframeOptions {
                detect_every: 5,
                ..ReframeOptions::for_target(45, 80)
            },
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        // Without a tracker every frame asks the detector.
        assert_eq!(report.detector_calls, 10);
        assert_eq!(probes.tracker.lock().unwrap().created, 0);
        for plan in &report.trajectory {
            assert_eq!(plan.raw, Point::frame_center(W, H));
            assert_eq!(plan.crop.center(), Point::frame_center(W, H));
        }
    }

    #[test]
    fn test_zero_pan_cap_leaves_smoothed_path_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let script = (0..10)
            .map(|i| vec![BoundingBox::new(10.0 + 30.0 * i as f64, 60.0, 40.0, 40.0)])
            .collect();
        let (detector, _) = ScriptedDetector::scripted(script, Vec::new());
        let (use_case, _) = Setup {
            detector: Some(detector),
            options: ReframeOptions {
                detect_every: 1,
                ema_alpha: 0.5,
                pan_cap_px: 0.0,
                ..ReframeOptions::for_target(45, 80)
            },
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        for plan in &report.trajectory {
            assert_eq!(plan.capped, plan.smoothed);
        }
    }

    #[test]
    fn test_pan_cap_bounds_each_camera_step() {
        let dir = tempfile::tempdir().unwrap();
        let script = (0..10)
            .map(|i| vec![BoundingBox::new(10.0 + 30.0 * i as f64, 60.0, 40.0, 40.0)])
            .collect();
        let (detector, _) = ScriptedDetector::scripted(script, Vec::new());
        let (use_case, _) = Setup {
            detector: Some(detector),
            options: ReframeOptions {
                detect_every: 1,
                ema_alpha: 0.5,
                pan_cap_px: 2.0,
                ..ReframeOptions::for_target(45, 80)
            },
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        for pair in report.trajectory.windows(2) {
            let step = pair[0].capped.distance_to(&pair[1].capped);
            assert!(step <= 2.0 + 1e-9, "camera moved {step}px");
        }
        let last = report.trajectory.last().unwrap();
        assert!(last.capped.x < last.smoothed.x);
    }

    #[test]
    fn test_fixed_box_override_never_detects_or_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, probes) = Setup {
            options: ReframeOptions {
                subject_override: Some(SubjectOverride::FixedBox {
                    x: 0.25,
                    y: 0.25,
                    width: 0.1,
                    height: 0.5,
                }),
                ..ReframeOptions::for_target(45, 80)
            },
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        assert_eq!(report.detector_calls, 0);
        assert_eq!(report.tracker_updates, 0);
        assert!(probes.detector_calls.lock().unwrap().is_empty());
        assert_eq!(probes.tracker.lock().unwrap().created, 0);
        for plan in &report.trajectory {
            assert_eq!(plan.crop.center(), Point::new(96.0, 80.0));
        }
    }

    #[test]
    fn test_tracker_fills_frames_between_detections() {
        let dir = tempfile::tempdir().unwrap();
        let (detector, _) = ScriptedDetector::always(vec![centered_box()]);
        let (use_case, probes) = Setup {
            detector: Some(detector),
            options: ReframeOptions {
                detect_every: 4,
                ..ReframeOptions::for_target(45, 80)
            },
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        assert_eq!(*probes.detector_calls.lock().unwrap(), vec![0, 4, 8]);
        assert_eq!(report.tracker_updates, 7);
        assert_eq!(report.tracker_losses, 0);
    }

    // --- Output ---

    #[test]
    fn test_every_written_frame_has_target_size() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, probes) = Setup::default().build();

        use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        let log = probes.writer.lock().unwrap();
        let opened = log.opened.as_ref().unwrap();
        assert_eq!((opened.width, opened.height), (45, 80));
        assert_eq!(opened.fps, 30.0);
        assert_eq!(log.written.len(), 10);
        assert!(log.written.iter().all(|f| f.width() == 45 && f.height() == 80));
        assert!(log.closed);
    }

    #[test]
    fn test_report_omits_trajectory_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, probes) = Setup {
            trajectory: false,
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        assert_eq!(report.frames_written, 10);
        assert_eq!(probes.writer.lock().unwrap().written.len(), 10);
        assert!(report.trajectory.is_empty());
    }

    #[test]
    fn test_each_stage_is_timed_separately() {
        let dir = tempfile::tempdir().unwrap();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let (use_case, _) = Setup {
            frames: 3,
            ..Setup::default()
        }
        .build();
        let use_case = use_case.with_logger(Box::new(StageLogger {
            stages: stages.clone(),
        }));

        use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        let per_frame = ["locate", "plan", "crop", "resize", "write"];
        let expected: Vec<&str> = per_frame.iter().copied().cycle().take(15).collect();
        assert_eq!(*stages.lock().unwrap(), expected);
    }

    #[test]
    fn test_missing_frame_rate_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let (use_case, probes) = Setup {
            fps: 0.0,
            ..Setup::default()
        }
        .build();

        use_case.execute(Path::new("clip.mp4"), &destination(&dir)).unwrap();

        let log = probes.writer.lock().unwrap();
        assert_eq!(log.opened.as_ref().unwrap().fps, FALLBACK_FPS);
    }

    #[test]
    fn test_source_without_audio_promotes_silent_stream_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, _) = Setup::default().build();

        let report = use_case.execute(Path::new("clip.mp4"), &dest).unwrap();

        assert_eq!(report.audio, AudioOutcome::NoAudio);
        assert_eq!(std::fs::read(&dest).unwrap(), silent_bytes(10));
        assert!(!OutputFinalizer::new(&dest).silent_path().exists());
    }

    #[test]
    fn test_source_audio_is_remuxed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, _) = Setup {
            remuxer: StubRemuxer::new(true, false),
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &dest).unwrap();

        assert_eq!(report.audio, AudioOutcome::Muxed);
        assert_eq!(std::fs::read(&dest).unwrap(), MUXED_BYTES);
    }

    #[test]
    fn test_remux_failure_keeps_silent_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, _) = Setup {
            remuxer: StubRemuxer::new(true, true),
            ..Setup::default()
        }
        .build();

        let report = use_case.execute(Path::new("clip.mp4"), &dest).unwrap();

        assert_eq!(report.audio, AudioOutcome::FellBackToSilent);
        assert_eq!(std::fs::read(&dest).unwrap(), silent_bytes(10));
    }

    // --- Failures ---

    #[test]
    fn test_unreadable_source_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, probes) = Setup {
            fail_open: true,
            ..Setup::default()
        }
        .build();

        let err = use_case.execute(Path::new("broken.mp4"), &dest).unwrap_err();

        assert!(matches!(
            err,
            ReframeError::SourceUnreadable { ref path, .. } if path == Path::new("broken.mp4")
        ));
        assert!(probes.writer.lock().unwrap().opened.is_none());
        assert!(!dest.exists());
    }

    #[test]
    fn test_encode_failure_discards_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, probes) = Setup {
            fail_write_at: Some(3),
            ..Setup::default()
        }
        .build();

        let err = use_case.execute(Path::new("clip.mp4"), &dest).unwrap_err();

        assert!(matches!(err, ReframeError::Encode(ref m) if m.contains("disk full")));
        assert!(probes.writer.lock().unwrap().closed);
        assert!(!dest.exists());
        assert!(!OutputFinalizer::new(&dest).silent_path().exists());
    }

    #[test]
    fn test_empty_source_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, _) = Setup {
            frames: 0,
            ..Setup::default()
        }
        .build();

        let err = use_case.execute(Path::new("clip.mp4"), &dest).unwrap_err();

        assert!(matches!(err, ReframeError::Decode(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_preset_cancel_flag_stops_before_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let (use_case, probes) = Setup::default().build();

        let err = use_case
            .with_cancel_flag(Arc::new(AtomicBool::new(true)))
            .execute(Path::new("clip.mp4"), &dest)
            .unwrap_err();

        assert!(matches!(err, ReframeError::Cancelled));
        assert!(probes.writer.lock().unwrap().written.is_empty());
        assert!(!dest.exists());
    }

    #[test]
    fn test_cancel_takes_effect_at_frame_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let dest = destination(&dir);
        let flag = Arc::new(AtomicBool::new(false));
        let (use_case, probes) = Setup::default().build();

        let err = use_case
            .with_cancel_flag(flag.clone())
            .with_logger(Box::new(CancellingLogger {
                after: 3,
                flag: flag.clone(),
            }))
            .execute(Path::new("clip.mp4"), &dest)
            .unwrap_err();

        assert!(matches!(err, ReframeError::Cancelled));
        assert_eq!(probes.writer.lock().unwrap().written.len(), 3);
        assert!(!dest.exists());
    }

    #[test]
    fn test_invalid_options_rejected_at_construction() {
        let (detector, _) = ScriptedDetector::always(Vec::new());
        let (tracker_factory, _) = stub_tracker_factory(None);
        let result = ReframeVideoUseCase::new(
            Box::new(StubReader::blank(0)),
            Box::new(StubWriter::new(None).0),
            Box::new(detector),
            tracker_factory,
            Box::new(StubRemuxer::new(false, false)),
            ReframeOptions {
                detect_every: 0,
                ..ReframeOptions::default()
            },
        );
        assert!(matches!(result, Err(ReframeError::InvalidOptions(_))));
    }

    // --- ffmpeg end to end ---

    mod ffmpeg {
        use super::*;
        use crate::video::infrastructure::ffmpeg_audio_remuxer::FfmpegAudioRemuxer;
        use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
        use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
        use crate::video::infrastructure::test_media::{add_tone_track, create_test_video};

        fn run(source: &Path, dest: &Path) -> ReframeReport {
            let (detector, _) = ScriptedDetector::always(Vec::new());
            let (tracker_factory, _) = stub_tracker_factory(None);
            ReframeVideoUseCase::new(
                Box::new(FfmpegReader::new()),
                Box::new(FfmpegWriter::new()),
                Box::new(detector),
                tracker_factory,
                Box::new(FfmpegAudioRemuxer),
                ReframeOptions::for_target(36, 64),
            )
            .unwrap()
            .execute(source, dest)
            .unwrap()
        }

        #[test]
        fn test_silent_source_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("source.mp4");
            let dest = dir.path().join("out").join("source_tracked_9x16.mp4");
            create_test_video(&source, 12, 64, 48, 25.0);

            let report = run(&source, &dest);

            assert_eq!(report.audio, AudioOutcome::NoAudio);
            assert_eq!(report.frames_written, 12);
            let mut reader = FfmpegReader::new();
            let meta = reader.open(&dest).unwrap();
            assert_eq!((meta.width, meta.height), (36, 64));
            assert!((meta.fps - 25.0).abs() < 0.5, "fps {}", meta.fps);
            assert_eq!(reader.frames().count(), 12);
            assert!(!FfmpegAudioRemuxer.has_audio(&dest));
        }

        #[test]
        fn test_source_audio_survives_reframing() {
            let dir = tempfile::tempdir().unwrap();
            let silent = dir.path().join("silent.mp4");
            let source = dir.path().join("source.mp4");
            let dest = dir.path().join("source_tracked_9x16.mp4");
            create_test_video(&silent, 25, 64, 48, 25.0);
            add_tone_track(&silent, &source, 1.0);

            let report = run(&source, &dest);

            assert_eq!(report.audio, AudioOutcome::Muxed);
            assert!(FfmpegAudioRemuxer.has_audio(&dest));
            assert!(!dir.path().join("source_tracked_9x16_tmp.mp4").exists());
            assert!(!dir.path().join("source_tracked_9x16_mux.mp4").exists());
        }
    }
}
