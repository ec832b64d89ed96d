use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
///
/// Writers produce a silent, video-only container. Audio is added
/// afterwards by an [`AudioRemuxer`](super::audio_remuxer::AudioRemuxer).
pub trait VideoWriter: Send {
    /// Prepares `path` for frames of `metadata.width` × `metadata.height`
    /// at `metadata.fps`.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes pending frames and finalizes the container.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
