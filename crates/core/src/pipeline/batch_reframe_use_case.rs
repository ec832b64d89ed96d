use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detection::domain::subject_override::SubjectOverride;
use crate::shared::reframe_error::ReframeError;

use super::reframe_video_use_case::{ReframeReport, ReframeVideoUseCase};

/// One source reframed to one target size.
#[derive(Clone, Debug, PartialEq)]
pub struct ReframeJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub target_width: u32,
    pub target_height: u32,
    pub subject_override: Option<SubjectOverride>,
}

impl ReframeJob {
    /// Short name for log lines, e.g. `clip.mp4 [1080x1920]`.
    pub fn label(&self) -> String {
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string());
        format!("{name} [{}x{}]", self.target_width, self.target_height)
    }
}

/// Builds a fresh, fully wired use case for a job.
///
/// Called once per job from worker threads, so every run gets its own
/// reader, writer, detector session and tracker state.
pub trait RunFactory: Send + Sync {
    fn build(&self, job: &ReframeJob) -> Result<ReframeVideoUseCase, ReframeError>;
}

/// The outcome of one job, in the order the jobs were submitted.
#[derive(Debug)]
pub struct JobResult {
    pub job: ReframeJob,
    pub outcome: Result<ReframeReport, ReframeError>,
}

impl JobResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs reframing jobs on a fixed pool of worker threads.
///
/// Workers pull jobs from a shared queue. A failing job is reported in its
/// own [`JobResult`] and never stops the others. Setting the cancel flag
/// makes running jobs stop at their next frame and marks every job not yet
/// started as [`ReframeError::Cancelled`].
pub struct BatchReframeUseCase {
    factory: Box<dyn RunFactory>,
    workers: usize,
    cancelled: Arc<AtomicBool>,
}

impl BatchReframeUseCase {
    pub fn new(factory: Box<dyn RunFactory>, workers: usize) -> Self {
        Self {
            factory,
            workers: workers.max(1),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn execute(&self, jobs: Vec<ReframeJob>) -> Vec<JobResult> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, ReframeJob)>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, JobResult)>();
        for entry in jobs.into_iter().enumerate() {
            if job_tx.send(entry).is_err() {
                break;
            }
        }
        drop(job_tx);

        log::info!("Reframing {total} job(s) on {workers} worker(s)");

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let factory = self.factory.as_ref();
                let cancelled = &self.cancelled;
                scope.spawn(move || {
                    for (index, job) in job_rx {
                        let outcome = run_job(factory, &job, cancelled);
                        match &outcome {
                            Ok(report) => log::info!(
                                "[{}/{total}] {} done: {} frames",
                                index + 1,
                                job.label(),
                                report.frames_written
                            ),
                            Err(e) => {
                                log::error!("[{}/{total}] {} failed: {e}", index + 1, job.label())
                            }
                        }
                        if result_tx.send((index, JobResult { job, outcome })).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<JobResult>> = (0..total).map(|_| None).collect();
        for (index, result) in result_rx {
            slots[index] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }
}

fn run_job(
    factory: &dyn RunFactory,
    job: &ReframeJob,
    cancelled: &Arc<AtomicBool>,
) -> Result<ReframeReport, ReframeError> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(ReframeError::Cancelled);
    }
    factory
        .build(job)?
        .with_cancel_flag(cancelled.clone())
        .execute(&job.source, &job.destination)
}
