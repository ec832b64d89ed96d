use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named output formats and their delivery resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectPreset {
    #[serde(rename = "9x16")]
    Portrait,
    #[serde(rename = "1x1")]
    Square,
    #[serde(rename = "16x9")]
    Landscape,
}

impl AspectPreset {
    pub const ALL: &[AspectPreset] = &[
        AspectPreset::Portrait,
        AspectPreset::Square,
        AspectPreset::Landscape,
    ];

    /// Output `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectPreset::Portrait => (1080, 1920),
            AspectPreset::Square => (1080, 1080),
            AspectPreset::Landscape => (1920, 1080),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            AspectPreset::Portrait => "9x16",
            AspectPreset::Square => "1x1",
            AspectPreset::Landscape => "16x9",
        }
    }
}

impl fmt::Display for AspectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AspectPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectPreset::ALL
            .iter()
            .copied()
            .find(|p| p.key() == s.trim())
            .ok_or_else(|| format!("unknown ratio '{s}', expected one of: 9x16, 1x1, 16x9"))
    }
}
