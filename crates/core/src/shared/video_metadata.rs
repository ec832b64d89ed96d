use std::path::PathBuf;

/// Stream properties reported by a reader and declared to a writer.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Metadata for an output stream of `width` × `height` that keeps this
    /// stream's frame rate and frame count.
    pub fn resized(&self, width: u32, height: u32) -> VideoMetadata {
        VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: self.total_frames,
            codec: String::new(),
            source_path: None,
        }
    }
}
