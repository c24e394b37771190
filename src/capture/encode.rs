//! Still-image encoding.
//!
//! Frames come out of the camera as raw RGB8; this module turns them into
//! PNG or JPEG bytes for the photo store. Encoding happens outside any
//! camera or frame-slot lock.

use crate::camera::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output format for captured photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG.
    Jpeg,
}

impl PhotoFormat {
    /// File extension used by the photo store.
    pub fn extension(self) -> &'static str {
        match self {
            PhotoFormat::Png => "png",
            PhotoFormat::Jpeg => "jpg",
        }
    }
}

/// Encoding parameters applied to every capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Output format.
    pub format: PhotoFormat,
    /// PNG compression level, 0 (largest/fastest) to 9 (smallest/slowest).
    pub png_compression: u8,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            format: PhotoFormat::Png,
            png_compression: 3,
            jpeg_quality: 90,
        }
    }
}

impl EncodeConfig {
    /// Validates the encoding parameters.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.png_compression > 9 {
            return Err(EncodeError::InvalidCompression(self.png_compression));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(EncodeError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }

    fn png_compression_type(&self) -> CompressionType {
        // The encoder exposes three presets rather than the 0-9 scale.
        match self.png_compression {
            0..=2 => CompressionType::Fast,
            3..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid PNG compression level {0} (must be 0-9)")]
    InvalidCompression(u8),
    #[error("invalid JPEG quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("frame pixel buffer does not match its dimensions")]
    MalformedFrame,
    #[error("image encoding failed: {0}")]
    Encoder(#[from] image::ImageError),
}

/// Encodes a frame into image bytes per the configuration.
pub fn encode_frame(frame: &Frame, config: &EncodeConfig) -> Result<Vec<u8>, EncodeError> {
    if !frame.is_valid() {
        return Err(EncodeError::MalformedFrame);
    }

    let mut out = Vec::new();
    match config.format {
        PhotoFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut out,
                config.png_compression_type(),
                FilterType::Adaptive,
            );
            encoder.write_image(
                frame.pixels(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        PhotoFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, config.jpeg_quality);
            encoder.write_image(
                frame.pixels(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        let pixels: Vec<u8> = (0..(32 * 24 * 3)).map(|i| (i % 256) as u8).collect();
        Frame::new(pixels, 32, 24, 1)
    }

    #[test]
    fn test_png_roundtrip_header() {
        let bytes = encode_frame(&test_frame(), &EncodeConfig::default()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_jpeg_header() {
        let config = EncodeConfig {
            format: PhotoFormat::Jpeg,
            ..Default::default()
        };
        let bytes = encode_frame(&test_frame(), &config).unwrap();
        assert_eq!(&bytes[..2], b"\xff\xd8");
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let frame = Frame::new(vec![0u8; 10], 32, 24, 1);
        assert!(matches!(
            encode_frame(&frame, &EncodeConfig::default()),
            Err(EncodeError::MalformedFrame)
        ));
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = EncodeConfig::default();
        assert!(config.validate().is_ok());
        config.png_compression = 10;
        assert!(config.validate().is_err());
        config.png_compression = 9;
        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(PhotoFormat::Png.extension(), "png");
        assert_eq!(PhotoFormat::Jpeg.extension(), "jpg");
    }
}
