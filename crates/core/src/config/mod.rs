use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{HandCursorError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub filter: FilterConfig,
    pub mapping: MappingConfig,
    pub gesture: GestureConfig,
    pub stabilizer: StabilizerConfig,
    pub broadcast: BroadcastConfig,
    pub capture: CaptureConfig,
}

impl AppConfig {
    /// Loads a JSON configuration file. Missing sections and fields fall back
    /// to their defaults; the result is validated before it is returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.mapping.validate()?;
        self.gesture.validate()?;

        if self.stabilizer.window == 0 {
            return Err(HandCursorError::InvalidInput(
                "stabilizer window must hold at least one label",
            ));
        }
        if self.broadcast.subscriber_capacity == 0 {
            return Err(HandCursorError::InvalidInput(
                "subscriber capacity must be at least one message",
            ));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(HandCursorError::InvalidInput(
                "capture resolution must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Parameters of the per-axis adaptive low-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Cutoff (Hz) applied when the cursor is still. Lower is steadier.
    pub min_cutoff: f32,
    /// How strongly speed raises the cutoff. Higher means less lag.
    pub beta: f32,
    /// Cutoff (Hz) used when smoothing the velocity estimate.
    pub d_cutoff: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_cutoff: 0.05,
            beta: 0.5,
            d_cutoff: 1.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_cutoff > 0.0) || !(self.d_cutoff > 0.0) {
            return Err(HandCursorError::InvalidInput(
                "filter cutoffs must be positive",
            ));
        }
        if !(self.beta >= 0.0) {
            return Err(HandCursorError::InvalidInput(
                "filter beta must not be negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Fraction of the frame ignored on each edge before remapping to [0, 1].
    pub margin: f32,
    /// Flip landmarks horizontally so the cursor moves like a mirror image.
    pub mirror: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            margin: 0.15,
            mirror: true,
        }
    }
}

impl MappingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..0.5).contains(&self.margin) {
            return Err(HandCursorError::InvalidInput(
                "mapping margin must lie in [0, 0.5)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Thumb/index tip distance in pixels below which a pinch is reported.
    pub pinch_threshold_px: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold_px: 65.0,
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.pinch_threshold_px >= 0.0) {
            return Err(HandCursorError::InvalidInput(
                "pinch threshold must not be negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    pub window: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

/// Pacing and delivery settings for the broadcast loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub frame_interval_ms: u64,
    pub retry_delay_ms: u64,
    /// Queue depth per subscriber. A full queue drops the frame for that
    /// subscriber only.
    pub subscriber_capacity: usize,
    /// How long a stopped loop waits for the source to be released. A source
    /// stuck in a blocking read is released once that read returns.
    pub release_timeout_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 10,
            retry_delay_ms: 100,
            subscriber_capacity: 4,
            release_timeout_ms: 1000,
        }
    }
}

impl BroadcastConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn release_timeout(&self) -> Duration {
        Duration::from_millis(self.release_timeout_ms)
    }
}

/// Resolution of the camera frames the detector runs on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stabilizer.window, 5);
        assert_eq!(config.broadcast.frame_interval(), Duration::from_millis(10));
        assert_eq!(config.broadcast.release_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "filter": { "beta": 1.5 }, "mapping": { "mirror": false } }"#)
                .unwrap();

        assert_eq!(config.filter.beta, 1.5);
        assert_eq!(config.filter.min_cutoff, 0.05);
        assert!(!config.mapping.mirror);
        assert_eq!(config.mapping.margin, 0.15);
        assert_eq!(config.gesture.pinch_threshold_px, 65.0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        config.mapping.margin = 0.5;
        assert!(matches!(
            config.validate(),
            Err(HandCursorError::InvalidInput(_))
        ));

        let mut config = AppConfig::default();
        config.filter.min_cutoff = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stabilizer.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn pretty_json_round_trips() {
        let config = AppConfig::default();
        let parsed: AppConfig = serde_json::from_str(&config.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "hand-cursor-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "gesture": { "pinch_threshold_px": 40.0 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.gesture.pinch_threshold_px, 40.0);
        assert_eq!(config.capture.width, 1080);
    }
}
