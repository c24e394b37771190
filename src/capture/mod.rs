//! Capture coordination.
//!
//! The coordinator owns the camera handle, serializes every access to it,
//! and produces a still photo on disk on demand. It is the one component
//! shared by all trigger sources: the GPIO push-button, the HTTP capture
//! endpoint, and (in buffered mode) the background acquisition loop all
//! meet here, and none of them ever race on the device.
//!
//! # Strategies
//!
//! Two capture strategies are selectable at configuration time:
//!
//! - **Direct**: each capture takes an exclusive lock on the device,
//!   discards a few buffered frames so the driver's internal queue does
//!   not serve up a stale one, then performs one blocking read.
//! - **Buffered** (default): a dedicated thread continuously reads the
//!   device and keeps the single newest frame in a shared slot. Captures
//!   copy out of the slot with no device I/O, paying only a staleness
//!   check that catches a stalled camera.
//!
//! In both strategies, encoding and the disk write happen after every
//! lock is released.

mod encode;
mod worker;

pub use encode::{encode_frame, EncodeConfig, EncodeError, PhotoFormat};

use crate::camera::{Camera, CameraConfig, CameraError};
use crate::store::{Photo, PhotoStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use worker::FrameSlot;

/// Pause between discarded frames under the direct strategy; gives the
/// driver time to deliver a current frame.
const DISCARD_PAUSE: Duration = Duration::from_millis(10);

/// Errors produced by [`CaptureCoordinator`].
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The device could not be opened or configured. Fatal at startup;
    /// there is no capture without a camera.
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(#[source] CameraError),

    /// A device read failed. Recoverable; the caller may retry but the
    /// coordinator never retries internally.
    #[error("frame capture failed: {0}")]
    CaptureFailed(#[from] CameraError),

    /// The acquisition loop has not published any frame yet.
    #[error("no camera frame available yet")]
    FrameUnavailable,

    /// The newest available frame is older than the configured maximum,
    /// which means the camera has stalled.
    #[error("latest frame too old ({age:.2?})")]
    StaleFrame {
        /// Observed age of the frame at capture time.
        age: Duration,
    },

    /// The acquisition thread could not be spawned.
    #[error("failed to start acquisition thread: {0}")]
    Thread(#[source] std::io::Error),

    /// Frame encoding failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The photo store rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Capture strategy, selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// Lock the device, discard `discard_frames` queued frames, then
    /// perform one blocking read.
    Direct {
        /// Frames to flush from the driver queue before the real read.
        discard_frames: u32,
    },
    /// Keep a background acquisition loop running and serve captures from
    /// its latest-frame slot.
    Buffered {
        /// Discarded reads at loop start, letting auto-exposure settle.
        warmup_frames: u32,
        /// Maximum tolerated frame age before a capture is refused.
        max_frame_age: Duration,
    },
}

impl Default for CaptureStrategy {
    fn default() -> Self {
        CaptureStrategy::Buffered {
            warmup_frames: 10,
            max_frame_age: Duration::from_secs(1),
        }
    }
}

enum Mode {
    Direct {
        camera: Mutex<Box<dyn Camera>>,
        discard_frames: u32,
    },
    Buffered {
        slot: Arc<FrameSlot>,
        max_frame_age: Duration,
        worker: Mutex<Option<JoinHandle<()>>>,
    },
}

/// Owns the camera and turns trigger requests into photos on disk.
///
/// Constructed once at process start and shared (behind an `Arc`) with
/// every trigger source. `capture` is safe to call concurrently; at most
/// one physical device read is ever in flight.
pub struct CaptureCoordinator {
    mode: Mode,
    store: PhotoStore,
    encode: EncodeConfig,
    stop: Arc<AtomicBool>,
}

impl CaptureCoordinator {
    /// Opens and configures the device, starts the acquisition loop when
    /// the strategy calls for one, and returns the running coordinator.
    ///
    /// Fails with [`CaptureError::DeviceUnavailable`] if the device cannot
    /// be opened; callers should treat that as fatal to startup.
    pub fn start(
        mut camera: Box<dyn Camera>,
        camera_config: &CameraConfig,
        strategy: CaptureStrategy,
        store: PhotoStore,
        encode: EncodeConfig,
    ) -> Result<Self, CaptureError> {
        encode.validate()?;
        camera
            .open(camera_config)
            .map_err(CaptureError::DeviceUnavailable)?;

        let stop = Arc::new(AtomicBool::new(false));
        let mode = match strategy {
            CaptureStrategy::Direct { discard_frames } => Mode::Direct {
                camera: Mutex::new(camera),
                discard_frames,
            },
            CaptureStrategy::Buffered {
                warmup_frames,
                max_frame_age,
            } => {
                let slot = Arc::new(FrameSlot::new());
                let handle = std::thread::Builder::new()
                    .name("frame-reader".to_string())
                    .spawn({
                        let slot = Arc::clone(&slot);
                        let stop = Arc::clone(&stop);
                        move || worker::run_acquisition_loop(camera, slot, stop, warmup_frames)
                    })
                    .map_err(CaptureError::Thread)?;
                Mode::Buffered {
                    slot,
                    max_frame_age,
                    worker: Mutex::new(Some(handle)),
                }
            }
        };

        tracing::info!(strategy = ?strategy, "capture coordinator started");
        Ok(Self {
            mode,
            store,
            encode,
            stop,
        })
    }

    /// Produces one still photo on disk and returns its descriptor.
    ///
    /// Concurrent calls serialize on the device (direct) or on a short
    /// in-memory copy (buffered); each call yields a distinct file. No
    /// lock is held across encoding or the disk write.
    pub fn capture(&self) -> Result<Photo, CaptureError> {
        let frame = match &self.mode {
            Mode::Direct {
                camera,
                discard_frames,
            } => {
                let mut cam = camera.lock().unwrap_or_else(PoisonError::into_inner);
                for _ in 0..*discard_frames {
                    // Flush the driver queue; a failed discard is harmless.
                    let _ = cam.discard_frame();
                    std::thread::sleep(DISCARD_PAUSE);
                }
                cam.read_frame()?
            }
            Mode::Buffered {
                slot,
                max_frame_age,
                ..
            } => {
                let frame = slot.snapshot().ok_or(CaptureError::FrameUnavailable)?;
                let age = frame.age();
                if age > *max_frame_age {
                    return Err(CaptureError::StaleFrame { age });
                }
                frame
            }
        };

        let bytes = encode_frame(&frame, &self.encode)?;
        let photo = self
            .store
            .write_photo(&bytes, self.encode.format.extension())?;
        tracing::info!(photo = %photo.name, bytes = bytes.len(), "photo captured");
        Ok(photo)
    }

    /// Returns true once shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Stops the acquisition loop (if any) and releases the device.
    ///
    /// Idempotent: safe to call from a signal handler and again on the
    /// normal exit path. In-flight captures are allowed to finish.
    pub fn shutdown(&self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        match &self.mode {
            Mode::Direct { camera, .. } => {
                camera
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .close();
            }
            Mode::Buffered { worker, .. } => {
                let handle = worker
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(handle) = handle {
                    if handle.join().is_err() {
                        tracing::warn!("acquisition thread panicked during shutdown");
                    }
                }
            }
        }
        tracing::info!("capture coordinator shut down");
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
