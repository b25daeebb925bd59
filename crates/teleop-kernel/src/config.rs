//! [`ArbiterConfig`] – resolved arbitration parameters.
//!
//! Axis and button indices are signed: a negative axis index disables that
//! control, and any index past the end of a sample reads as inactive.

use teleop_types::{Channel, HeadFormat};

use crate::head::HeadLimits;
use crate::safety::SafetyWindow;

/// Torso velocity commanded while only the "up" button is held.
pub const TORSO_UP_VELOCITY: f64 = 0.01;
/// Torso velocity commanded while only the "down" button is held.
pub const TORSO_DOWN_VELOCITY: f64 = -0.01;

pub const DEFAULT_MAX_VX: f64 = 0.6;
pub const DEFAULT_MAX_VY: f64 = 0.6;
pub const DEFAULT_MAX_VW: f64 = 0.8;
pub const DEFAULT_MAX_PAN: f64 = 2.7;
pub const DEFAULT_MAX_TILT: f64 = 1.4;
pub const DEFAULT_MIN_TILT: f64 = -0.4;
pub const DEFAULT_PAN_STEP: f64 = 0.02;
pub const DEFAULT_TILT_STEP: f64 = 0.015;

/// Per-axis velocity scale for the base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedScale {
    pub vx: f64,
    pub vy: f64,
    pub vw: f64,
}

/// Everything the [`CommandArbiter`][crate::arbiter::CommandArbiter] needs
/// to turn frames into commands.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbiterConfig {
    /// Scales used while the run button is released.
    pub nominal: SpeedScale,
    /// Scales used while the run button is held.  Expected to be at least
    /// `nominal`, but not enforced.
    pub run: SpeedScale,

    pub head_limits: HeadLimits,
    pub pan_step: f64,
    pub tilt_step: f64,

    pub axis_vx: i32,
    pub axis_vy: i32,
    pub axis_vw: i32,
    pub axis_pan: i32,
    pub axis_tilt: i32,

    pub deadman_button: i32,
    pub run_button: i32,
    pub torso_dn_button: i32,
    pub torso_up_button: i32,
    pub head_button: i32,

    pub safety: SafetyWindow,
    /// Suppress every channel while disengaged instead of sending zeros.
    pub deadman_no_publish: bool,
    pub head_format: HeadFormat,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            nominal: SpeedScale {
                vx: DEFAULT_MAX_VX,
                vy: DEFAULT_MAX_VY,
                vw: DEFAULT_MAX_VW,
            },
            run: SpeedScale {
                vx: DEFAULT_MAX_VX,
                vy: DEFAULT_MAX_VY,
                vw: DEFAULT_MAX_VW,
            },
            head_limits: HeadLimits {
                max_pan: DEFAULT_MAX_PAN,
                min_tilt: DEFAULT_MIN_TILT,
                max_tilt: DEFAULT_MAX_TILT,
            },
            pan_step: DEFAULT_PAN_STEP,
            tilt_step: DEFAULT_TILT_STEP,
            axis_vx: 3,
            axis_vy: 2,
            axis_vw: 0,
            axis_pan: 0,
            axis_tilt: 2,
            deadman_button: 0,
            run_button: 0,
            torso_dn_button: 0,
            torso_up_button: 0,
            head_button: 0,
            safety: SafetyWindow::unbounded(),
            deadman_no_publish: false,
            head_format: HeadFormat::default(),
        }
    }
}

impl ArbiterConfig {
    /// The torso channel exists only when a down button other than 0 is bound.
    pub fn torso_enabled(&self) -> bool {
        self.torso_dn_button != 0
    }

    /// The head channel exists only when a head-mode button other than 0 is
    /// bound.
    pub fn head_enabled(&self) -> bool {
        self.head_button != 0
    }

    /// Outbound channels this configuration publishes on.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = vec![Channel::BaseVelocity];
        if self.torso_enabled() {
            channels.push(Channel::TorsoVelocity);
        }
        if self.head_enabled() {
            channels.push(Channel::Head);
        }
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_advertises_base_only() {
        let cfg = ArbiterConfig::default();
        assert_eq!(cfg.channels(), vec![Channel::BaseVelocity]);
    }

    #[test]
    fn torso_channel_keyed_on_down_button() {
        let cfg = ArbiterConfig {
            torso_up_button: 4,
            ..ArbiterConfig::default()
        };
        assert!(!cfg.torso_enabled());

        let cfg = ArbiterConfig {
            torso_dn_button: 6,
            head_button: 5,
            ..ArbiterConfig::default()
        };
        assert_eq!(
            cfg.channels(),
            vec![Channel::BaseVelocity, Channel::TorsoVelocity, Channel::Head]
        );
    }
}
