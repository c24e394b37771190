//! Background frame acquisition for the buffered capture strategy.
//!
//! One thread owns the camera for the coordinator's lifetime and keeps
//! exactly the newest frame published in a shared slot. Capture requests
//! copy out of the slot and never touch the device.

use crate::camera::{Camera, Frame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Pause before retrying after a failed device read. A transient read
/// failure is not fatal to the loop.
const READ_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Single shared cell holding the most recent frame.
///
/// Written only by the acquisition loop, read (cloned) by capture
/// requests. The lock is held only for the swap or the copy, so readers
/// never observe a partially written frame and never block on device I/O.
#[derive(Default)]
pub(crate) struct FrameSlot {
    inner: Mutex<Option<Frame>>,
}

impl FrameSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the slot contents with a newer frame.
    pub(crate) fn publish(&self, frame: Frame) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(frame);
    }

    /// Copies the current frame out of the slot, if one has ever been
    /// published.
    pub(crate) fn snapshot(&self) -> Option<Frame> {
        let slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}

/// Acquisition loop body. Runs on a dedicated thread; consumes the camera
/// and closes it on exit.
pub(crate) fn run_acquisition_loop(
    mut camera: Box<dyn Camera>,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    warmup_frames: u32,
) {
    // Warm-up reads let auto-exposure and auto-white-balance settle so the
    // first published frame is not a driver-startup artifact.
    for i in 0..warmup_frames {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if let Err(e) = camera.discard_frame() {
            tracing::debug!(warmup = i, error = %e, "warm-up read failed");
        }
    }
    tracing::debug!(warmup_frames, "camera warm-up complete");

    while !stop.load(Ordering::Relaxed) {
        match camera.read_frame() {
            Ok(frame) => slot.publish(frame),
            Err(e) => {
                tracing::debug!(error = %e, "frame read failed, backing off");
                std::thread::sleep(READ_RETRY_DELAY);
            }
        }
    }

    camera.close();
    tracing::info!("frame acquisition loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, MockCamera};

    #[test]
    fn test_slot_starts_empty() {
        let slot = FrameSlot::new();
        assert!(slot.snapshot().is_none());
    }

    #[test]
    fn test_slot_holds_newest_frame() {
        let slot = FrameSlot::new();
        slot.publish(Frame::new(vec![0u8; 3], 1, 1, 1));
        slot.publish(Frame::new(vec![0u8; 3], 1, 1, 2));

        let frame = slot.snapshot().unwrap();
        assert_eq!(frame.sequence(), 2);
        // The copy is independent of the slot contents.
        assert!(slot.snapshot().is_some());
    }

    #[test]
    fn test_loop_publishes_and_stops() {
        let mut camera = MockCamera::new();
        camera
            .open(&CameraConfig {
                width: 8,
                height: 8,
                ..Default::default()
            })
            .unwrap();

        let slot = Arc::new(FrameSlot::new());
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let (slot, stop) = (Arc::clone(&slot), Arc::clone(&stop));
            std::thread::spawn(move || run_acquisition_loop(Box::new(camera), slot, stop, 2))
        };

        // Wait for the loop to get past warm-up and publish something.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while slot.snapshot().is_none() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let frame = slot.snapshot().expect("loop never published a frame");
        // Two warm-up reads happened first.
        assert!(frame.sequence() > 2);

        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }
}
