use crate::color::Color;
use crate::error::PalettizeError;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

/// Distance used both for nearest-color search and for pair eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Taxicab,
    Euclidean,
}

impl FromStr for Metric {
    type Err = PalettizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "taxicab" | "manhattan" => Ok(Metric::Taxicab),
            "euclidean" => Ok(Metric::Euclidean),
            other => Err(PalettizeError::InvalidSettings(format!(
                "unknown metric '{}' (expected taxicab or euclidean)",
                other
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Taxicab => write!(f, "taxicab"),
            Metric::Euclidean => write!(f, "euclidean"),
        }
    }
}

/// Run settings. Every field has a default so palette files written before a
/// field existed still load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dither: bool,
    pub block_factor: u32,
    pub metric: Metric,
    /// Pairs at or below this fraction of the reference distance are not blended.
    pub lower_threshold: f64,
    /// Pairs at or above this fraction of the reference distance are not blended.
    pub upper_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dither: true,
            block_factor: 1,
            metric: Metric::Taxicab,
            lower_threshold: 0.0,
            upper_threshold: 0.5,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), PalettizeError> {
        if self.block_factor == 0 {
            return Err(PalettizeError::InvalidSettings(
                "block factor must be at least 1".to_string(),
            ));
        }
        if !self.lower_threshold.is_finite() || !self.upper_threshold.is_finite() {
            return Err(PalettizeError::InvalidSettings(
                "thresholds must be finite".to_string(),
            ));
        }
        if self.lower_threshold < 0.0 || self.lower_threshold >= self.upper_threshold {
            return Err(PalettizeError::InvalidSettings(format!(
                "thresholds must satisfy 0 <= lower < upper, got {} and {}",
                self.lower_threshold, self.upper_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Colors gathered from the command line, already deduplicated.
    pub colors: Vec<Color>,
    pub settings: Settings,
    pub palette_path: Option<PathBuf>,
}
