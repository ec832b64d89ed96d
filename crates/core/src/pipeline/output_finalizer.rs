use std::path::{Path, PathBuf};

use crate::shared::reframe_error::ReframeError;
use crate::video::domain::audio_remuxer::AudioRemuxer;

/// What happened to the source audio when an output was promoted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioOutcome {
    /// Source audio was copied into the output.
    Muxed,
    /// The source had no audio; the silent stream is the output.
    NoAudio,
    /// Remuxing failed, so the silent stream was promoted instead.
    FellBackToSilent,
}

/// Owns the temporary files of one output until it is complete.
///
/// The encoder writes to `<stem>_tmp.<ext>` and the remuxer to
/// `<stem>_mux.<ext>`, both next to the destination. Only a finished file is
/// renamed onto the destination, so a failed run never leaves a partial
/// output where the caller expects a result.
pub struct OutputFinalizer {
    destination: PathBuf,
    silent: PathBuf,
    muxed: PathBuf,
}

impl OutputFinalizer {
    pub fn new(destination: &Path) -> Self {
        Self {
            destination: destination.to_path_buf(),
            silent: sibling(destination, "tmp"),
            muxed: sibling(destination, "mux"),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Where the encoder should write the silent stream.
    pub fn silent_path(&self) -> &Path {
        &self.silent
    }

    pub fn muxed_path(&self) -> &Path {
        &self.muxed
    }

    /// Creates the destination directory and clears leftovers from an
    /// earlier interrupted run.
    pub fn prepare(&self) -> Result<(), ReframeError> {
        if let Some(parent) = self.destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ReframeError::io(parent, e))?;
            }
        }
        self.discard();
        Ok(())
    }

    /// Carries the audio of `source` over and promotes the result.
    ///
    /// Remux failures fall back to the silent stream. Only filesystem
    /// errors during promotion are returned, after the temporaries have
    /// been removed.
    pub fn finalize(
        &self,
        source: &Path,
        remuxer: &dyn AudioRemuxer,
    ) -> Result<AudioOutcome, ReframeError> {
        let result = self.promote(source, remuxer);
        if result.is_err() {
            self.discard();
        }
        result
    }

    /// Removes both temporary files if they exist.
    pub fn discard(&self) {
        for path in [&self.silent, &self.muxed] {
            match std::fs::remove_file(path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Cannot remove {}: {e}", path.display()),
            }
        }
    }

    fn promote(
        &self,
        source: &Path,
        remuxer: &dyn AudioRemuxer,
    ) -> Result<AudioOutcome, ReframeError> {
        if !remuxer.has_audio(source) {
            self.rename(&self.silent)?;
            return Ok(AudioOutcome::NoAudio);
        }

        match remuxer.remux(source, &self.silent, &self.muxed) {
            Ok(()) => {
                self.rename(&self.muxed)?;
                remove_quietly(&self.silent);
                Ok(AudioOutcome::Muxed)
            }
            Err(e) => {
                log::warn!(
                    "Audio remux failed for {}, keeping silent video: {e}",
                    self.destination.display()
                );
                remove_quietly(&self.muxed);
                self.rename(&self.silent)?;
                Ok(AudioOutcome::FellBackToSilent)
            }
        }
    }

    fn rename(&self, from: &Path) -> Result<(), ReframeError> {
        std::fs::rename(from, &self.destination)
            .map_err(|e| ReframeError::io(&self.destination, e))
    }
}

/// `dir/clip.mp4` + `tmp` → `dir/clip_tmp.mp4`.
fn sibling(destination: &Path, tag: &str) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = destination
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    destination.with_file_name(format!("{stem}_{tag}.{ext}"))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Cannot remove {}: {e}", path.display());
        }
    }
}
