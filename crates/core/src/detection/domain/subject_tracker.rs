use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for following one subject between detections.
///
/// A tracker is bound to a single subject by `init`; re-targeting means
/// building a fresh tracker through a [`TrackerFactory`].
pub trait SubjectTracker: Send {
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), Box<dyn std::error::Error>>;

    /// Returns the subject's new box, or `None` when it has been lost.
    fn update(&mut self, frame: &Frame)
        -> Result<Option<BoundingBox>, Box<dyn std::error::Error>>;
}

/// Builds an uninitialized tracker each time the locator re-targets.
pub type TrackerFactory = Box<dyn Fn() -> Box<dyn SubjectTracker> + Send>;
