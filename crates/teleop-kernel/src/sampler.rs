//! [`InputSampler`] – latest-frame store for the input device.
//!
//! The device driver calls [`InputSampler::on_device_sample`] whenever a new
//! axis/button snapshot arrives.  Only the most recent frame is kept; a new
//! sample overwrites the previous one.  The control tick reads the frame with
//! [`InputSampler::latest`] and never holds on to it between ticks.

use std::sync::Mutex;
use std::time::Instant;

use teleop_types::JoySample;

/// A device sample together with the instant it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFrame {
    pub sample: JoySample,
    pub received_at: Instant,
}

impl InputFrame {
    pub fn new(sample: JoySample, received_at: Instant) -> Self {
        Self {
            sample,
            received_at,
        }
    }
}

/// Last-value-wins holder for the most recent [`InputFrame`].
///
/// Safe to share between the sample callback and the control tick; the
/// frame is swapped under a mutex so a tick never observes a partial write.
#[derive(Debug, Default)]
pub struct InputSampler {
    latest: Mutex<Option<InputFrame>>,
}

impl InputSampler {
    /// Create a sampler that has not yet seen any frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new device sample stamped with the current time.
    ///
    /// Returns a copy of the stored frame so the caller can fold it into the
    /// arbiter's per-frame update.
    pub fn on_device_sample(&self, axes: Vec<f64>, buttons: Vec<bool>) -> InputFrame {
        self.record_at(JoySample::new(axes, buttons), Instant::now())
    }

    /// Record `sample` as received at `at`.
    pub fn record_at(&self, sample: JoySample, at: Instant) -> InputFrame {
        let frame = InputFrame::new(sample, at);
        let mut slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(frame.clone());
        frame
    }

    /// Snapshot of the most recent frame, or `None` before the first sample.
    pub fn latest(&self) -> Option<InputFrame> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
