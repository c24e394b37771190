//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both a real UVC/V4L2 backend and a mock implementation
//! for tests and camera-less builds.

use super::{CameraConfig, Frame};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
///
/// A camera is blocking by nature: `read_frame` does not return until the
/// driver delivers (or fails to deliver) a frame. Callers that live on an
/// async runtime must cross over with `spawn_blocking`.
pub trait Camera: Send {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CameraConfig) -> Result<(), CameraError>;

    /// Blocking-reads a single decoded frame.
    fn read_frame(&mut self) -> Result<Frame, CameraError>;

    /// Reads and discards one frame, skipping decode where the backend
    /// supports it. Used to flush driver-internal frame queues.
    fn discard_frame(&mut self) -> Result<(), CameraError> {
        self.read_frame().map(|_| ())
    }

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases the device. Closing an already-closed
    /// camera is a no-op.
    fn close(&mut self);
}

/// Mock camera that generates synthetic frames.
///
/// Used in tests and in builds without the `camera` feature.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CameraConfig>,
    sequence: u64,
    fail_reads: bool,
    fail_after: Option<u64>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `read_frame` fail with `CaptureFailed`.
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Makes reads fail after `n` successful frames, simulating a camera
    /// that stalls mid-run.
    pub fn set_fail_after(&mut self, n: u64) {
        self.fail_after = Some(n);
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!(device = %config.device, "MockCamera opened");
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        let stalled = self.fail_after.is_some_and(|n| self.sequence >= n);
        if self.fail_reads || stalled {
            return Err(CameraError::CaptureFailed("injected failure".to_string()));
        }

        // Synthetic gradient pattern shifted by sequence, purely for testing
        // frame handling and encoding.
        let (w, h) = (config.width as usize, config.height as usize);
        let mut pixels = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                pixels.push(((x as u64 + self.sequence) % 256) as u8);
                pixels.push(((y as u64 + self.sequence) % 256) as u8);
                pixels.push((self.sequence % 256) as u8);
            }
        }

        self.sequence += 1;
        Ok(Frame::new(pixels, config.width, config.height, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            tracing::info!("MockCamera closed");
        }
    }
}

/// Real UVC/V4L2 camera backend over `nokhwa`.
///
/// Requests MJPEG at the configured resolution and frame rate (the format
/// UVC webcams deliver full-rate HD in) and decodes to RGB8.
#[cfg(feature = "camera")]
pub struct UvcCamera {
    inner: Option<nokhwa::Camera>,
    sequence: u64,
}

#[cfg(feature = "camera")]
impl UvcCamera {
    pub fn new() -> Self {
        Self {
            inner: None,
            sequence: 0,
        }
    }

    fn parse_index(device: &str) -> nokhwa::utils::CameraIndex {
        use nokhwa::utils::CameraIndex;
        match device.parse::<u32>() {
            Ok(n) => CameraIndex::Index(n),
            Err(_) => CameraIndex::String(device.to_string()),
        }
    }
}

#[cfg(feature = "camera")]
impl Default for UvcCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "camera")]
impl Camera for UvcCamera {
    fn open(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        use nokhwa::pixel_format::RgbFormat;
        use nokhwa::utils::{
            CameraFormat, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
        };

        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let index = Self::parse_index(&config.device);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));

        let mut camera = nokhwa::Camera::new(index, requested)
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        tracing::info!(
            device = %config.device,
            format = %camera.camera_format(),
            "UVC camera opened"
        );
        self.inner = Some(camera);
        self.sequence = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        use nokhwa::pixel_format::RgbFormat;

        let camera = self.inner.as_mut().ok_or(CameraError::NotInitialized)?;
        let buffer = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        self.sequence += 1;
        let (width, height) = (decoded.width(), decoded.height());
        Ok(Frame::new(decoded.into_raw(), width, height, self.sequence))
    }

    fn discard_frame(&mut self) -> Result<(), CameraError> {
        // Pull a buffer without the MJPEG decode.
        let camera = self.inner.as_mut().ok_or(CameraError::NotInitialized)?;
        camera
            .frame()
            .map(|_| ())
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.inner.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "failed to stop camera stream");
            }
            tracing::info!("UVC camera closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CameraConfig::default();

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.read_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.read_frame().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
        camera.close(); // second close is a no-op
    }

    #[test]
    fn test_read_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.read_frame(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_injected_read_failure() {
        let mut camera = MockCamera::new();
        camera.open(&CameraConfig::default()).unwrap();
        camera.set_fail_reads(true);
        assert!(matches!(
            camera.read_frame(),
            Err(CameraError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_discard_frame_advances_sequence() {
        let mut camera = MockCamera::new();
        camera.open(&CameraConfig::default()).unwrap();
        camera.discard_frame().unwrap();
        let frame = camera.read_frame().unwrap();
        assert_eq!(frame.sequence(), 2);
    }
}
