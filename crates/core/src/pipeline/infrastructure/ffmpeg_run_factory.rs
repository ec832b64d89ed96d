use crate::detection::infrastructure::detector_factory::DetectorFactory;
use crate::pipeline::batch_reframe_use_case::{ReframeJob, RunFactory};
use crate::pipeline::pipeline_logger::StdoutPipelineLogger;
use crate::pipeline::reframe_options::ReframeOptions;
use crate::pipeline::reframe_video_use_case::ReframeVideoUseCase;
use crate::shared::reframe_error::ReframeError;
use crate::video::infrastructure::ffmpeg_audio_remuxer::FfmpegAudioRemuxer;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
use crate::video::infrastructure::ffmpeg_writer::{FfmpegWriter, DEFAULT_BIT_RATE};

const DEFAULT_PROGRESS_EVERY: usize = 100;

/// Wires ffmpeg decoding/encoding/remuxing and the ONNX detector into a
/// run for each job.
///
/// `tuning` supplies cadence, smoothing and pan cap; target size and
/// override come from the job.
pub struct FfmpegRunFactory {
    detectors: DetectorFactory,
    tuning: ReframeOptions,
    bit_rate: usize,
    progress_every: usize,
}

impl FfmpegRunFactory {
    pub fn new(detectors: DetectorFactory, tuning: ReframeOptions) -> Self {
        Self {
            detectors,
            tuning,
            bit_rate: DEFAULT_BIT_RATE,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    pub fn with_bit_rate(mut self, bit_rate: usize) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    pub fn with_progress_every(mut self, frames: usize) -> Self {
        self.progress_every = frames;
        self
    }

    fn options_for(&self, job: &ReframeJob) -> ReframeOptions {
        ReframeOptions {
            target_width: job.target_width,
            target_height: job.target_height,
            subject_override: job.subject_override,
            ..self.tuning.clone()
        }
    }
}

impl RunFactory for FfmpegRunFactory {
    fn build(&self, job: &ReframeJob) -> Result<ReframeVideoUseCase, ReframeError> {
        let options = self.options_for(job);
        // Fail on bad options before paying for a model session.
        options.validate()?;

        let detector = self.detectors.build_detector()?;
        let logger = StdoutPipelineLogger::new(self.progress_every).with_label(job.label());

        let use_case = ReframeVideoUseCase::new(
            Box::new(FfmpegReader::new()),
            Box::new(FfmpegWriter::new().with_bit_rate(self.bit_rate)),
            detector,
            DetectorFactory::tracker_factory(),
            Box::new(FfmpegAudioRemuxer),
            options,
        )?;
        Ok(use_case.with_logger(Box::new(logger)))
    }
}
