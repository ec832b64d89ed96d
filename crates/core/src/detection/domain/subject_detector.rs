use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for finding reframing subjects (faces, people) in a frame.
///
/// Returns zero or more candidates in no particular order; callers pick the
/// one they want. `&mut self` lets backends keep scratch buffers between calls.
pub trait SubjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
