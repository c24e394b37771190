//! Camera device configuration.
//!
//! Resolution and frame rate are requested from the driver at open time;
//! UVC devices are free to pick the closest supported mode, so the values
//! here are a request, not a guarantee.

use serde::{Deserialize, Serialize};

/// Configuration for the capture device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device reference: a V4L2 path (`/dev/video0`) or a numeric index.
    pub device: String,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Requested frames per second.
    pub fps: u32,
    /// Driver-internal buffer size hint. Kept at 1 so on-demand reads see
    /// the most recent frame the driver can deliver; not always honored.
    pub buffer_hint: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 1920,
            height: 1080,
            fps: 30,
            buffer_hint: 1,
        }
    }
}

impl CameraConfig {
    /// Creates a configuration for the given device reference.
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), CameraConfigError> {
        if self.device.is_empty() {
            return Err(CameraConfigError::EmptyDevice);
        }
        if self.width == 0 || self.height == 0 {
            return Err(CameraConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(CameraConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Camera configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CameraConfigError {
    #[error("device reference must not be empty")]
    EmptyDevice,
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CameraConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CameraConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(CameraConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_empty_device_invalid() {
        let config = CameraConfig::for_device("");
        assert!(matches!(
            config.validate(),
            Err(CameraConfigError::EmptyDevice)
        ));
    }
}
