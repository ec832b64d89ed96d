use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::detection::domain::subject_detector::SubjectDetector;
use crate::detection::domain::subject_tracker::TrackerFactory;
use crate::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use crate::shared::model_resolver::{ModelResolver, ProgressFn};
use crate::shared::reframe_error::ReframeError;

use super::onnx_yolo_detector::{OnnxYoloDetector, DEFAULT_CLASS_ID, DEFAULT_CONFIDENCE};
use super::template_tracker::{TemplateTracker, DEFAULT_MATCH_THRESHOLD, DEFAULT_SEARCH_FACTOR};

/// User-facing detector configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    /// Explicit weights file; when unset the bundled model is resolved from cache.
    pub model_path: Option<PathBuf>,
    pub confidence: f64,
    pub class_id: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            confidence: DEFAULT_CONFIDENCE,
            class_id: DEFAULT_CLASS_ID,
        }
    }
}

/// Builds detectors and trackers for reframing runs.
///
/// `resolve` locates the model and loads it once, so a missing or corrupt
/// model surfaces as [`ReframeError::DetectorUnavailable`] before any job
/// starts. The session loaded there is handed to the first run; runs after
/// it load their own session from the same read-only weights, since a
/// session serves one run at a time.
#[derive(Clone)]
pub struct DetectorFactory {
    model_path: PathBuf,
    confidence: f64,
    class_id: usize,
    warm: Arc<Mutex<Option<Box<dyn SubjectDetector>>>>,
}

impl fmt::Debug for DetectorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorFactory")
            .field("model_path", &self.model_path)
            .field("confidence", &self.confidence)
            .field("class_id", &self.class_id)
            .finish()
    }
}

impl DetectorFactory {
    pub fn resolve(
        settings: &DetectorSettings,
        resolver: &ModelResolver,
        progress: Option<ProgressFn>,
    ) -> Result<Self, ReframeError> {
        let model_path = locate_model(settings, resolver, progress)?;
        let factory = Self::unloaded(model_path, settings);
        let detector = factory.load()?;
        *factory.lock_warm() = Some(detector);
        log::info!("Using detector model {}", factory.model_path.display());
        Ok(factory)
    }

    /// A factory for `model_path` that has not loaded anything yet.
    pub(crate) fn unloaded(model_path: PathBuf, settings: &DetectorSettings) -> Self {
        Self {
            model_path,
            confidence: settings.confidence,
            class_id: settings.class_id,
            warm: Arc::new(Mutex::new(None)),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn build_detector(&self) -> Result<Box<dyn SubjectDetector>, ReframeError> {
        if let Some(detector) = self.lock_warm().take() {
            return Ok(detector);
        }
        self.load()
    }

    pub fn tracker_factory() -> TrackerFactory {
        TemplateTracker::factory(DEFAULT_MATCH_THRESHOLD, DEFAULT_SEARCH_FACTOR)
    }

    fn load(&self) -> Result<Box<dyn SubjectDetector>, ReframeError> {
        let detector = OnnxYoloDetector::new(&self.model_path, self.confidence, self.class_id)
            .map_err(|e| {
                ReframeError::DetectorUnavailable(format!(
                    "cannot load {}: {e}",
                    self.model_path.display()
                ))
            })?;
        Ok(Box::new(detector))
    }

    fn lock_warm(&self) -> MutexGuard<'_, Option<Box<dyn SubjectDetector>>> {
        // A poisoned slot only ever holds an unused session.
        self.warm.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Checks the settings and finds the weights file, downloading it into the
/// cache when needed.
fn locate_model(
    settings: &DetectorSettings,
    resolver: &ModelResolver,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ReframeError> {
    if !(0.0..=1.0).contains(&settings.confidence) {
        return Err(ReframeError::InvalidOptions(format!(
            "confidence must be between 0.0 and 1.0, got {}",
            settings.confidence
        )));
    }

    resolver
        .resolve(
            settings.model_path.as_deref(),
            YOLO_MODEL_NAME,
            YOLO_MODEL_URL,
            progress,
        )
        .map_err(|e| ReframeError::DetectorUnavailable(e.to_string()))
}
