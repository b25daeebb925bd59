//! Integrated head pan/tilt target.

use serde::{Deserialize, Serialize};

/// Clamp limits for the head target, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadLimits {
    /// Pan is clamped to `[-max_pan, max_pan]`.
    pub max_pan: f64,
    pub min_tilt: f64,
    pub max_tilt: f64,
}

impl HeadLimits {
    pub fn clamp_pan(&self, pan: f64) -> f64 {
        pan.min(self.max_pan).max(-self.max_pan)
    }

    pub fn clamp_tilt(&self, tilt: f64) -> f64 {
        tilt.min(self.max_tilt).max(self.min_tilt)
    }
}

/// Accumulated pan/tilt target.  Starts at zero and is only ever moved by
/// [`HeadPose::nudge_pan`] / [`HeadPose::nudge_tilt`], which clamp after
/// every increment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub pan: f64,
    pub tilt: f64,
}

impl HeadPose {
    pub fn nudge_pan(&mut self, delta: f64, limits: &HeadLimits) {
        self.pan = limits.clamp_pan(self.pan + delta);
    }

    pub fn nudge_tilt(&mut self, delta: f64, limits: &HeadLimits) {
        self.tilt = limits.clamp_tilt(self.tilt + delta);
    }
}
