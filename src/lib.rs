//! Shutterpi
//!
//! A push-button camera appliance: a UVC webcam on a single-board
//! computer, captured photos in a flat directory, and a small local web
//! gallery to browse, take, and delete them. Captures are triggered by a
//! GPIO push-button or a POST to `/capture`.
//!
//! # Architecture
//!
//! ```text
//! GPIO button ──┐
//!               ├──> capture (coordinator) ──> store (photo directory)
//! POST /capture ┘            │                       │
//!                       camera (device)         web (gallery/routes)
//! ```
//!
//! The capture coordinator is the heart of the crate: it owns the camera
//! handle, serializes all device access, and hands every trigger source a
//! fresh photo. Two strategies are selectable at configuration time, a
//! direct read-under-lock and a background-buffered latest-frame slot
//! with staleness rejection (the default). Everything else is I/O and
//! presentation glue around it.
//!
//! # Example
//!
//! ```no_run
//! use shutterpi::camera::{CameraConfig, MockCamera};
//! use shutterpi::capture::{CaptureCoordinator, CaptureStrategy, EncodeConfig};
//! use shutterpi::store::PhotoStore;
//!
//! let store = PhotoStore::new("pics").unwrap();
//! let coordinator = CaptureCoordinator::start(
//!     Box::new(MockCamera::new()),
//!     &CameraConfig::default(),
//!     CaptureStrategy::default(),
//!     store,
//!     EncodeConfig::default(),
//! )
//! .unwrap();
//!
//! match coordinator.capture() {
//!     Ok(photo) => println!("captured {}", photo.name),
//!     Err(e) => eprintln!("capture failed: {e}"),
//! }
//! coordinator.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod capture;
pub mod config;
pub mod store;
pub mod trigger;
pub mod web;

// Re-export commonly used types at crate root
pub use camera::{Camera, CameraConfig, CameraError, Frame, MockCamera};
pub use capture::{CaptureCoordinator, CaptureError, CaptureStrategy, EncodeConfig, PhotoFormat};
pub use config::AppConfig;
pub use store::{Photo, PhotoStore, StoreError};
pub use web::AppState;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
