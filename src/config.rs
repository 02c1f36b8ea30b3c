use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};

use crate::dtw::StepCost;
use crate::smoothing::DEFAULT_CAPACITY;

/// Frame rate assumed when a recording does not report one.
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
}

/// Thresholds for the real-time gesture rules. Coordinates are normalized
/// image units, angles are degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub smoothing_window: usize,
    pub confidence_threshold: f32,
    /// How far above the shoulder the wrist must be.
    pub arm_raise_margin: f32,
    pub squat_max_knee_angle: f32,
    pub squat_min_hip_drop: f32,
    pub sit_min_knee_angle: f32,
    pub sit_max_knee_angle: f32,
    pub sit_min_hip_drop: f32,
    /// Upper bound on hip height variance across the window for a held seat.
    pub sit_max_hip_variance: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_CAPACITY,
            confidence_threshold: 0.3,
            arm_raise_margin: 0.05,
            squat_max_knee_angle: 100.0,
            squat_min_hip_drop: 0.06,
            sit_min_knee_angle: 70.0,
            sit_max_knee_angle: 110.0,
            sit_min_hip_drop: 0.06,
            sit_max_hip_variance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub step_cost: StepCost,
    /// Sakoe-Chiba band half-width in frames; `None` searches the full grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<usize>,
    /// Threads for the parallel window search; 0 uses available parallelism.
    pub workers: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            step_cost: StepCost::Euclidean,
            band: None,
            workers: 0,
        }
    }
}

/// Reject a frame rate that cannot timestamp events.
pub fn validate_frame_rate(rate: f32) -> Result<f32> {
    if !(rate.is_finite() && rate > 0.0) {
        bail!("frame rate must be positive, got {}", rate);
    }
    Ok(rate)
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if d.smoothing_window == 0 {
            bail!("detector.smoothing_window must be at least 1");
        }
        if !(0.0..=1.0).contains(&d.confidence_threshold) {
            bail!(
                "detector.confidence_threshold must be within [0, 1], got {}",
                d.confidence_threshold
            );
        }
        if d.sit_min_knee_angle > d.sit_max_knee_angle {
            bail!(
                "detector.sit_min_knee_angle ({}) exceeds sit_max_knee_angle ({})",
                d.sit_min_knee_angle,
                d.sit_max_knee_angle
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir()
            .join(format!("gesture-sentinel-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.detector.sit_min_hip_drop = 0.2;
        config.matcher.band = Some(4);

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: Config = toml::from_str(
            r#"
            [detector]
            confidence_threshold = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.detector.confidence_threshold, 0.5);
        assert_eq!(config.detector.smoothing_window, 5);
        assert_eq!(config.matcher, MatcherConfig::default());
    }

    #[test]
    fn test_step_cost_names() {
        let config: Config = toml::from_str(
            r#"
            [matcher]
            step_cost = "root_sum_squares"
            "#,
        )
        .unwrap();
        assert_eq!(config.matcher.step_cost, StepCost::RootSumSquares);
    }

    #[test]
    fn test_validate_rejects_inverted_sit_band() {
        let mut config = Config::default();
        config.detector.sit_min_knee_angle = 120.0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.detector.smoothing_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_rate_must_be_positive() {
        assert_eq!(validate_frame_rate(25.0).unwrap(), 25.0);
        assert!(validate_frame_rate(0.0).is_err());
        assert!(validate_frame_rate(-5.0).is_err());
        assert!(validate_frame_rate(f32::NAN).is_err());
    }
}
