use std::path::Path;

/// Carries a source's audio over to a freshly encoded silent video.
pub trait AudioRemuxer: Send {
    /// Whether `source` has an audio stream worth carrying over.
    /// Unreadable sources report `false`.
    fn has_audio(&self, source: &Path) -> bool;

    /// Writes `destination` with the video of `silent_video` and the audio
    /// of `source`. `destination` must differ from both inputs.
    fn remux(
        &self,
        source: &Path,
        silent_video: &Path,
        destination: &Path,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
