//! Physical shutter button.
//!
//! A debounced GPIO input that fires a capture on every press. The button
//! is fire-and-forget by design: there is no feedback channel on a
//! physical switch, so capture runs on a detached thread and the outcome
//! is only logged, never surfaced to the operator.
//!
//! Real GPIO access sits behind the `gpio` cargo feature so the rest of
//! the crate builds and tests on machines without a pin header.

use crate::capture::CaptureCoordinator;
use std::sync::Arc;

pub use crate::config::ButtonConfig;

/// Errors that can occur while binding the shutter button.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// The GPIO peripheral or pin could not be acquired.
    #[error("failed to bind GPIO button: {0}")]
    Gpio(String),
}

/// Runs one fire-and-forget capture on a detached thread.
///
/// Shared by the GPIO callback and anything else that wants button
/// semantics; errors are swallowed after logging.
pub fn spawn_capture(coordinator: Arc<CaptureCoordinator>) {
    std::thread::spawn(move || {
        if coordinator.is_shutting_down() {
            tracing::debug!("ignoring trigger during shutdown");
            return;
        }
        match coordinator.capture() {
            Ok(photo) => tracing::info!(photo = %photo.name, "button capture"),
            Err(e) => tracing::warn!(error = %e, "button capture failed"),
        }
    });
}

/// Debounced GPIO push-button bound to the capture coordinator.
///
/// Holds the input pin for its own lifetime; dropping the button
/// unregisters the interrupt.
#[cfg(feature = "gpio")]
pub struct ShutterButton {
    _pin: rppal::gpio::InputPin,
}

#[cfg(feature = "gpio")]
impl ShutterButton {
    /// Claims the configured pin as a pull-up input and installs a
    /// falling-edge interrupt (press pulls the line low) with hardware
    /// debounce at the configured interval.
    pub fn bind(
        config: &ButtonConfig,
        coordinator: Arc<CaptureCoordinator>,
    ) -> Result<Self, TriggerError> {
        use rppal::gpio::{Gpio, Trigger};
        use std::time::Duration;

        let gpio = Gpio::new().map_err(|e| TriggerError::Gpio(e.to_string()))?;
        let mut pin = gpio
            .get(config.pin)
            .map_err(|e| TriggerError::Gpio(e.to_string()))?
            .into_input_pullup();

        let debounce = Duration::from_millis(config.debounce_ms);
        pin.set_async_interrupt(Trigger::FallingEdge, Some(debounce), move |_| {
            tracing::info!("shutter button pressed");
            spawn_capture(Arc::clone(&coordinator));
        })
        .map_err(|e| TriggerError::Gpio(e.to_string()))?;

        tracing::info!(
            pin = config.pin,
            debounce_ms = config.debounce_ms,
            "shutter button bound"
        );
        Ok(Self { _pin: pin })
    }
}
