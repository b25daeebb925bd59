//! [`SafetyWindow`] – deadman and staleness interlock.
//!
//! Motion is allowed only while the operator holds the deadman button *and*
//! the latest frame is fresh.  Freshness is measured against the frame's
//! arrival time; a frame is fresh while `now - received_at <= timeout`.
//! A window built from a non-positive timeout never goes stale.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::sampler::InputFrame;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Output of the safety gate for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Deadman held and the latest frame is fresh.
    Engaged,
    /// Deadman released, frame stale, or no frame received yet.
    #[default]
    Disengaged,
}

impl GateState {
    pub fn is_engaged(self) -> bool {
        self == GateState::Engaged
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SafetyWindow
// ────────────────────────────────────────────────────────────────────────────

/// Staleness window applied to the most recent input frame.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use teleop_kernel::safety::{GateState, SafetyWindow};
/// use teleop_kernel::sampler::InputFrame;
/// use teleop_types::JoySample;
///
/// let window = SafetyWindow::from_secs(0.2);
/// let t0 = Instant::now();
/// let frame = InputFrame::new(JoySample::new(vec![], vec![true]), t0);
///
/// assert_eq!(window.evaluate(Some(&frame), 0, t0), GateState::Engaged);
/// assert_eq!(
///     window.evaluate(Some(&frame), 0, t0 + Duration::from_millis(300)),
///     GateState::Disengaged,
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyWindow {
    timeout: Option<Duration>,
}

impl SafetyWindow {
    /// A window that never expires.
    pub fn unbounded() -> Self {
        Self { timeout: None }
    }

    /// A window that expires `timeout` after the last frame.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Build from a parameter value in seconds; `<= 0` (or non-finite)
    /// disables the timeout.  A value too large for a [`Duration`] is
    /// treated as no timeout.
    pub fn from_secs(timeout_secs: f64) -> Self {
        if !(timeout_secs.is_finite() && timeout_secs > 0.0) {
            return Self::unbounded();
        }
        match Duration::try_from_secs_f64(timeout_secs) {
            Ok(timeout) => Self::new(timeout),
            Err(e) => {
                warn!(
                    joy_msg_timeout = timeout_secs,
                    error = %e,
                    "timeout out of range; disabling it"
                );
                Self::unbounded()
            }
        }
    }

    /// Configured timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `true` while a frame received at `received_at` is still usable at `now`.
    pub fn is_fresh(&self, received_at: Instant, now: Instant) -> bool {
        match self.timeout {
            None => true,
            Some(timeout) => now.saturating_duration_since(received_at) <= timeout,
        }
    }

    /// Evaluate the gate for the latest `frame` at `now`.
    ///
    /// `deadman_button` is read from the frame's buttons; an index outside
    /// the frame reads as released.
    pub fn evaluate(
        &self,
        frame: Option<&InputFrame>,
        deadman_button: i32,
        now: Instant,
    ) -> GateState {
        match frame {
            Some(frame)
                if frame.sample.button(deadman_button)
                    && self.is_fresh(frame.received_at, now) =>
            {
                GateState::Engaged
            }
            _ => GateState::Disengaged,
        }
    }
}
