//! Editor configuration
//!
//! Defaults reproduce the constants of the web console the canvas was built
//! for. A TOML file may override any subset of them.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete editor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub viewport: ViewportConfig,
    pub run: RunTiming,
    pub geometry: NodeGeometry,
}

impl EditorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded editor configuration from {}", path.as_ref().display());
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let vp = &self.viewport;
        if !(vp.min_scale > 0.0 && vp.min_scale <= 1.0 && vp.max_scale >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "scale bounds must satisfy 0 < min <= 1 <= max, got [{}, {}]",
                vp.min_scale, vp.max_scale
            )));
        }
        if !(vp.zoom_sensitivity.is_finite() && vp.zoom_sensitivity > 0.0) {
            return Err(ConfigError::Invalid(
                "zoom_sensitivity must be positive".to_string(),
            ));
        }
        let run = &self.run;
        if run.step_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "step_interval_ms must be non-zero".to_string(),
            ));
        }
        for (name, value) in [
            ("step_interval_ms", run.step_interval_ms),
            ("success_delay_ms", run.success_delay_ms),
            ("completion_buffer_ms", run.completion_buffer_ms),
        ] {
            if value > RunTiming::MAX_DELAY_MS {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at most {} ms, got {value}",
                    RunTiming::MAX_DELAY_MS
                )));
            }
        }
        let geo = &self.geometry;
        if geo.width <= 0.0 || geo.height <= 0.0 || geo.connector_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "node geometry must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Scale change per unit of wheel delta
    pub zoom_sensitivity: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 3.0,
            zoom_sensitivity: 0.001,
        }
    }
}

/// Timing of the scripted run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTiming {
    /// Delay between consecutive nodes entering `running`
    pub step_interval_ms: u64,
    /// Delay from `running` to `success` for one node
    pub success_delay_ms: u64,
    /// Delay from the last `success` to the completion entry
    pub completion_buffer_ms: u64,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self {
            step_interval_ms: 1000,
            success_delay_ms: 800,
            completion_buffer_ms: 1200,
        }
    }
}

impl RunTiming {
    /// Upper bound accepted by [`EditorConfig::validate`] for each delay
    pub const MAX_DELAY_MS: u64 = 3_600_000;

    fn running_ms(&self, index: usize) -> u64 {
        let index = u64::try_from(index).unwrap_or(u64::MAX);
        self.step_interval_ms.saturating_mul(index)
    }

    fn success_ms(&self, index: usize) -> u64 {
        self.running_ms(index).saturating_add(self.success_delay_ms)
    }

    /// Offset at which node `index` enters `running`. All offsets saturate
    /// at `u64::MAX` milliseconds.
    pub fn running_at(&self, index: usize) -> Duration {
        Duration::from_millis(self.running_ms(index))
    }

    pub fn success_at(&self, index: usize) -> Duration {
        Duration::from_millis(self.success_ms(index))
    }

    /// Completion time for a run over `count` nodes (`count >= 1`)
    pub fn completion_at(&self, count: usize) -> Duration {
        Duration::from_millis(
            self.success_ms(count.saturating_sub(1))
                .saturating_add(self.completion_buffer_ms),
        )
    }
}

/// Node box and connector hotspot dimensions, in model units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeGeometry {
    pub width: f32,
    pub height: f32,
    pub connector_radius: f32,
}

impl Default for NodeGeometry {
    fn default() -> Self {
        Self {
            width: 220.0,
            height: 72.0,
            connector_radius: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing_matches_console() {
        let timing = RunTiming::default();
        assert_eq!(timing.running_at(2), Duration::from_millis(2000));
        assert_eq!(timing.success_at(2), Duration::from_millis(2800));
        // n * 1000 + 1000
        assert_eq!(timing.completion_at(4), Duration::from_millis(5000));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            [viewport]
            max_scale = 4.0

            [run]
            step_interval_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.viewport.max_scale, 4.0);
        assert_eq!(config.viewport.min_scale, 0.2);
        assert_eq!(config.run.step_interval_ms, 10);
        assert_eq!(config.run.success_delay_ms, 800);
    }

    #[test]
    fn rejects_inverted_scale_bounds() {
        let err = EditorConfig::from_toml_str("[viewport]\nmin_scale = 2.0\nmax_scale = 0.5\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn timing_offsets_saturate() {
        let timing = RunTiming {
            step_interval_ms: u64::MAX / 2,
            success_delay_ms: u64::MAX,
            completion_buffer_ms: 1,
        };
        assert_eq!(timing.running_at(4), Duration::from_millis(u64::MAX));
        assert_eq!(timing.success_at(0), Duration::from_millis(u64::MAX));
        assert_eq!(timing.completion_at(4), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn rejects_oversized_delays() {
        let err = EditorConfig::from_toml_str("[run]\nstep_interval_ms = 9000000000000000000\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
        let err = EditorConfig::from_toml_str("[run]\ncompletion_buffer_ms = 3600001\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
        assert!(EditorConfig::from_toml_str("[run]\nsuccess_delay_ms = 3600000\n").is_ok());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EditorConfig::from_toml_str("[viewport\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }
}
