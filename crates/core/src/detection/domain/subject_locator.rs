use crate::detection::domain::subject_detector::SubjectDetector;
use crate::detection::domain::subject_override::SubjectOverride;
use crate::detection::domain::subject_tracker::{SubjectTracker, TrackerFactory};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::point::Point;
use crate::shared::reframe_error::ReframeError;

/// Where the subject is on one frame, as decided by the locator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Location {
    /// A detected, tracked or overridden box.
    Subject(BoundingBox),
    /// An override that pins a point rather than a box.
    Fixed(Point),
    /// Nothing found; the crop falls back to the frame center.
    Lost,
}

impl Location {
    /// The raw crop center for this frame.
    pub fn raw_center(&self, frame_w: u32, frame_h: u32) -> Point {
        match self {
            Location::Subject(bbox) => bbox.center(),
            Location::Fixed(point) => *point,
            Location::Lost => Point::frame_center(frame_w, frame_h),
        }
    }

    pub fn subject(&self) -> Option<BoundingBox> {
        match self {
            Location::Subject(bbox) => Some(*bbox),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatorPhase {
    NoTracker,
    Tracking,
    Override,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocatorStats {
    pub detector_calls: usize,
    pub tracker_updates: usize,
    pub tracker_losses: usize,
    pub retargets: usize,
}

/// Per-video detect/track state machine.
///
/// The expensive detector runs on cadence frames (`1, D+1, 2D+1, …`) and
/// whenever no tracker is alive; the cheap tracker fills the frames in
/// between. A configured override short-circuits both for the whole video.
/// One locator serves exactly one video.
pub struct SubjectLocator {
    detector: Box<dyn SubjectDetector>,
    tracker_factory: TrackerFactory,
    detect_every: usize,
    subject_override: Option<SubjectOverride>,
    tracker: Option<Box<dyn SubjectTracker>>,
    frame_number: usize,
    stats: LocatorStats,
}

impl SubjectLocator {
    pub fn new(
        detector: Box<dyn SubjectDetector>,
        tracker_factory: TrackerFactory,
        detect_every: usize,
    ) -> Self {
        Self {
            detector,
            tracker_factory,
            detect_every: detect_every.max(1),
            subject_override: None,
            tracker: None,
            frame_number: 0,
            stats: LocatorStats::default(),
        }
    }

    pub fn with_override(mut self, subject_override: Option<SubjectOverride>) -> Self {
        self.subject_override = subject_override;
        self
    }

    /// Advances the state machine by one frame.
    ///
    /// Frames must be passed in decode order. Tracker loss and empty
    /// detections are not errors; only backend failures are.
    pub fn locate(&mut self, frame: &Frame) -> Result<Location, ReframeError> {
        self.frame_number += 1;
        let (w, h) = (frame.width(), frame.height());

        if let Some(subject_override) = self.subject_override {
            return Ok(match subject_override.fixed_box(w, h) {
                Some(bbox) => Location::Subject(bbox),
                None => Location::Fixed(subject_override.fixed_center(w, h)),
            });
        }

        if self.detection_due() {
            if let Some(bbox) = self.detect(frame)? {
                self.retarget(frame, bbox)?;
                return Ok(Location::Subject(bbox));
            }
        }

        self.follow(frame)
    }

    pub fn phase(&self) -> LocatorPhase {
        if self.subject_override.is_some() {
            LocatorPhase::Override
        } else if self.tracker.is_some() {
            LocatorPhase::Tracking
        } else {
            LocatorPhase::NoTracker
        }
    }

    pub fn stats(&self) -> LocatorStats {
        self.stats
    }

    /// Number of frames seen so far (1-based index of the last frame).
    pub fn frame_number(&self) -> usize {
        self.frame_number
    }

    fn detection_due(&self) -> bool {
        self.tracker.is_none() || (self.frame_number - 1) % self.detect_every == 0
    }

    /// Runs the detector and picks the largest usable candidate.
    fn detect(&mut self, frame: &Frame) -> Result<Option<BoundingBox>, ReframeError> {
        self.stats.detector_calls += 1;
        let candidates = self
            .detector
            .detect(frame)
            .map_err(|e| ReframeError::Detection(e.to_string()))?;

        let usable: Vec<BoundingBox> = candidates
            .iter()
            .map(|b| b.clamp_to(frame.width(), frame.height()))
            .filter(|b| b.area() > 0.0)
            .collect();
        Ok(BoundingBox::largest(&usable))
    }

    /// Replaces any live tracker with a fresh one bound to `bbox`.
    fn retarget(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), ReframeError> {
        self.tracker = None;
        let mut tracker = (self.tracker_factory)();
        tracker
            .init(frame, bbox)
            .map_err(|e| ReframeError::Tracking(e.to_string()))?;
        self.tracker = Some(tracker);
        self.stats.retargets += 1;
        Ok(())
    }

    fn follow(&mut self, frame: &Frame) -> Result<Location, ReframeError> {
        let Some(tracker) = self.tracker.as_mut() else {
            return Ok(Location::Lost);
        };

        self.stats.tracker_updates += 1;
        let updated = tracker
            .update(frame)
            .map_err(|e| ReframeError::Tracking(e.to_string()))?
            .map(|b| b.clamp_to(frame.width(), frame.height()))
            .filter(|b| b.area() > 0.0);

        match updated {
            Some(bbox) => Ok(Location::Subject(bbox)),
            None => {
                log::debug!("Tracker lost subject at frame {}", self.frame_number);
                self.tracker = None;
                self.stats.tracker_losses += 1;
                Ok(Location::Lost)
            }
        }
    }
}
