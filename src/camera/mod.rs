//! Camera input and frame handling.
//!
//! This module provides abstractions for reading frames from a capture
//! device and managing device configuration. The physical camera is owned
//! by exactly one holder at a time; coordination of concurrent access
//! lives in [`crate::capture`], not here.

mod config;
mod device;
mod frame;

pub use config::{CameraConfig, CameraConfigError};
#[cfg(feature = "camera")]
pub use device::UvcCamera;
pub use device::{Camera, CameraError, MockCamera};
pub use frame::Frame;
