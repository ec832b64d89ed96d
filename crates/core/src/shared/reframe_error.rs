use std::path::PathBuf;

use thiserror::Error;

/// Why a reframing run failed.
///
/// Tracker loss, empty detections and audio remux failures are not errors;
/// they are recovered inside the run.
#[derive(Error, Debug)]
pub enum ReframeError {
    #[error("cannot open source {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },
    #[error("detector unavailable: {0}")]
    DetectorUnavailable(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("tracking failed: {0}")]
    Tracking(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("cancelled")]
    Cancelled,
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReframeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReframeError::Io {
            path: path.into(),
            source,
        }
    }
}
