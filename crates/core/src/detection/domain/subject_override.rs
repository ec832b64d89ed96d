use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::point::Point;

/// Caller-supplied subject position that replaces detection for a whole video.
///
/// Coordinates are normalized to `[0, 1]` of the frame so one override works
/// for any source resolution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectOverride {
    FixedCenter { x: f64, y: f64 },
    FixedBox { x: f64, y: f64, width: f64, height: f64 },
}

impl SubjectOverride {
    /// Checks that every coordinate is finite and inside `[0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        let values: Vec<(&str, f64)> = match *self {
            SubjectOverride::FixedCenter { x, y } => vec![("x", x), ("y", y)],
            SubjectOverride::FixedBox {
                x,
                y,
                width,
                height,
            } => vec![("x", x), ("y", y), ("width", width), ("height", height)],
        };
        for (name, value) in values {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!(
                    "override {name} must be within [0, 1], got {value}"
                ));
            }
        }
        Ok(())
    }

    /// The override box in pixels, clamped to the frame. `None` for a fixed center.
    pub fn fixed_box(&self, frame_w: u32, frame_h: u32) -> Option<BoundingBox> {
        match *self {
            SubjectOverride::FixedBox {
                x,
                y,
                width,
                height,
            } => {
                let (fw, fh) = (frame_w as f64, frame_h as f64);
                let bbox = BoundingBox::new(x * fw, y * fh, width * fw, height * fh);
                Some(bbox.clamp_to(frame_w, frame_h))
            }
            SubjectOverride::FixedCenter { .. } => None,
        }
    }

    /// The point the crop should follow, in pixels.
    pub fn fixed_center(&self, frame_w: u32, frame_h: u32) -> Point {
        match self.fixed_box(frame_w, frame_h) {
            Some(bbox) => bbox.center(),
            None => match *self {
                SubjectOverride::FixedCenter { x, y } => {
                    Point::new(x * frame_w as f64, y * frame_h as f64)
                }
                SubjectOverride::FixedBox { .. } => Point::frame_center(frame_w, frame_h),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum OverrideFileError {
    #[error("cannot read override file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed override file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid override for '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// One entry of an `overrides.json` file, as written by editors.
#[derive(Deserialize)]
struct OverrideEntry {
    manual_center: Option<[f64; 2]>,
    #[serde(rename = "box")]
    bbox: Option<[f64; 4]>,
}

impl OverrideEntry {
    fn into_override(self) -> Option<SubjectOverride> {
        // Box wins when both keys are set.
        if let Some([x, y, width, height]) = self.bbox {
            return Some(SubjectOverride::FixedBox {
                x,
                y,
                width,
                height,
            });
        }
        self.manual_center
            .map(|[x, y]| SubjectOverride::FixedCenter { x, y })
    }
}

/// Per-source overrides keyed by file name.
#[derive(Clone, Debug, Default)]
pub struct OverrideSet {
    entries: HashMap<String, SubjectOverride>,
}

impl OverrideSet {
    /// Parses an `overrides.json` file of the form
    /// `{"clip.mp4": {"manual_center": [x, y]} | {"box": [x, y, w, h]}}`.
    pub fn load(path: &Path) -> Result<Self, OverrideFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| OverrideFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|err| match err {
            ParseFailure::Json(source) => OverrideFileError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Invalid { name, reason } => OverrideFileError::Invalid { name, reason },
        })
    }

    fn parse(text: &str) -> Result<Self, ParseFailure> {
        let raw: HashMap<String, OverrideEntry> =
            serde_json::from_str(text).map_err(ParseFailure::Json)?;

        let mut entries = HashMap::new();
        for (name, entry) in raw {
            let Some(subject_override) = entry.into_override() else {
                log::warn!("Override for '{name}' has neither 'box' nor 'manual_center', ignoring");
                continue;
            };
            subject_override
                .validate()
                .map_err(|reason| ParseFailure::Invalid {
                    name: name.clone(),
                    reason,
                })?;
            entries.insert(name, subject_override);
        }
        Ok(Self { entries })
    }

    /// Looks up the override for `source` by its file name.
    pub fn for_source(&self, source: &Path) -> Option<SubjectOverride> {
        let name = source.file_name()?.to_str()?;
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    Invalid { name: String, reason: String },
}
