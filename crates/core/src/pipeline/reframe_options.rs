use serde::{Deserialize, Serialize};

use crate::detection::domain::subject_override::SubjectOverride;
use crate::framing::domain::aspect_preset::AspectPreset;
use crate::shared::constants::{DEFAULT_DETECT_EVERY, DEFAULT_EMA_ALPHA, DEFAULT_PAN_CAP_PX};
use crate::shared::reframe_error::ReframeError;

/// Tuning for one reframing run.
///
/// `detect_every` trades detector cost against how quickly the camera
/// re-acquires a subject. `ema_alpha` is the smoothing weight of the newest
/// center. `pan_cap_px` bounds the per-frame camera step; `0.0` disables it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReframeOptions {
    pub detect_every: usize,
    pub ema_alpha: f64,
    pub pan_cap_px: f64,
    pub target_width: u32,
    pub target_height: u32,
    pub subject_override: Option<SubjectOverride>,
}

impl Default for ReframeOptions {
    fn default() -> Self {
        let (target_width, target_height) = AspectPreset::Portrait.dimensions();
        Self {
            detect_every: DEFAULT_DETECT_EVERY,
            ema_alpha: DEFAULT_EMA_ALPHA,
            pan_cap_px: DEFAULT_PAN_CAP_PX,
            target_width,
            target_height,
            subject_override: None,
        }
    }
}

impl ReframeOptions {
    /// Default tuning with an explicit output size.
    pub fn for_target(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            ..Self::default()
        }
    }

    /// Output width divided by output height.
    pub fn target_ratio(&self) -> f64 {
        self.target_width as f64 / self.target_height as f64
    }

    pub fn validate(&self) -> Result<(), ReframeError> {
        if self.detect_every == 0 {
            return Err(invalid("detect_every must be at least 1"));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(invalid(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if !self.pan_cap_px.is_finite() || self.pan_cap_px < 0.0 {
            return Err(invalid(format!(
                "pan_cap_px must be a non-negative number, got {}",
                self.pan_cap_px
            )));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(invalid(format!(
                "target size must be positive, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if let Some(subject_override) = &self.subject_override {
            subject_override
                .validate()
                .map_err(|reason| invalid(format!("override: {reason}")))?;
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ReframeError {
    ReframeError::InvalidOptions(message.into())
}
