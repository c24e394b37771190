//! Application configuration.
//!
//! One TOML file covers the whole appliance: camera, capture strategy,
//! photo output, web server, and the push-button. Every section and every
//! field is optional; omitted values fall back to the defaults the
//! appliance ships with.

use crate::camera::CameraConfig;
use crate::capture::{CaptureStrategy, EncodeConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loading and validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which capture strategy the coordinator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Lock the device and read on demand, flushing the driver queue first.
    Direct,
    /// Serve captures from a continuously refreshed latest-frame slot.
    Buffered,
}

/// Capture strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Strategy selector.
    pub strategy: StrategyKind,
    /// Warm-up reads before the buffered loop publishes (buffered only).
    pub warmup_frames: u32,
    /// Frames flushed before an on-demand read (direct only).
    pub discard_frames: u32,
    /// Maximum tolerated frame age in milliseconds (buffered only).
    pub max_frame_age_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Buffered,
            warmup_frames: 10,
            discard_frames: 8,
            max_frame_age_ms: 1000,
        }
    }
}

impl CaptureSettings {
    /// Resolves the settings into a [`CaptureStrategy`].
    pub fn strategy(&self) -> CaptureStrategy {
        match self.strategy {
            StrategyKind::Direct => CaptureStrategy::Direct {
                discard_frames: self.discard_frames,
            },
            StrategyKind::Buffered => CaptureStrategy::Buffered {
                warmup_frames: self.warmup_frames,
                max_frame_age: Duration::from_millis(self.max_frame_age_ms),
            },
        }
    }
}

/// Photo output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Directory that holds the captured photos.
    pub dir: PathBuf,
    /// Encoding parameters.
    #[serde(flatten)]
    pub encode: EncodeConfig,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("pics"),
            encode: EncodeConfig::default(),
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// HTTP port to bind on all interfaces.
    pub port: u16,
    /// Auto-refresh interval for the live view, and the poll interval the
    /// gallery page uses against `/latest_ts`.
    pub refresh_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            refresh_secs: 2,
        }
    }
}

/// GPIO push-button settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Whether to bind the button at startup.
    pub enabled: bool,
    /// BCM pin number of the button input.
    pub pin: u8,
    /// Debounce interval in milliseconds.
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pin: 17,
            debounce_ms: 100,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Capture device settings.
    pub camera: CameraConfig,
    /// Capture strategy settings.
    pub capture: CaptureSettings,
    /// Photo output settings.
    pub photo: PhotoConfig,
    /// Web server settings.
    pub web: WebConfig,
    /// Push-button settings.
    pub button: ButtonConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.photo
            .encode
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.web.refresh_secs == 0 {
            return Err(ConfigError::Invalid(
                "web.refresh_secs must be at least 1".to_string(),
            ));
        }
        if self.capture.max_frame_age_ms == 0 {
            return Err(ConfigError::Invalid(
                "capture.max_frame_age_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PhotoFormat;

    #[test]
    fn test_default_config_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_strategy_is_buffered() {
        let settings = CaptureSettings::default();
        assert!(matches!(
            settings.strategy(),
            CaptureStrategy::Buffered {
                warmup_frames: 10,
                max_frame_age,
            } if max_frame_age == Duration::from_secs(1)
        ));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [camera]
            device = "/dev/video1"

            [photo]
            format = "jpeg"

            [capture]
            strategy = "direct"
            discard_frames = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.device, "/dev/video1");
        assert_eq!(config.camera.fps, 30);
        assert_eq!(config.photo.encode.format, PhotoFormat::Jpeg);
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.button.pin, 17);
        assert!(matches!(
            config.capture.strategy(),
            CaptureStrategy::Direct { discard_frames: 5 }
        ));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shutterpi.toml");
        std::fs::write(&path, "[web]\nport = 9090\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.refresh_secs, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config: AppConfig = toml::from_str("[web]\nrefresh_secs = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: AppConfig = toml::from_str("[camera]\nwidth = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(matches!(
            AppConfig::from_file("/nonexistent/shutterpi.toml"),
            Err(ConfigError::FileReadError(_))
        ));
    }
}
