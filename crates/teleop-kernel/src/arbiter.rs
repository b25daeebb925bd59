//! [`CommandArbiter`] – turns input frames into outbound commands.
//!
//! The arbiter has two entry points:
//!
//! 1. [`CommandArbiter::on_sample`] – called once per received frame.  While
//!    the gate is engaged and the head-mode button is held, the head axes are
//!    integrated into the persistent [`HeadPose`].  This is the only state
//!    that survives between frames.
//!
//! 2. [`CommandArbiter::tick`] – called at a fixed rate.  Evaluates the
//!    [`SafetyWindow`][crate::safety::SafetyWindow] against the latest frame,
//!    derives a fresh [`CommandState`] with [`compute_command`], and returns
//!    the commands that should be sent this tick.
//!
//! Base and torso velocities are recomputed from scratch every tick and are
//! exactly zero whenever the gate is disengaged.  The head target holds its
//! last integrated value across mode switches and disengaged periods.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use teleop_kernel::{ArbiterConfig, CommandArbiter, InputSampler};
//!
//! let config = ArbiterConfig {
//!     axis_vx: 1,
//!     deadman_button: 0,
//!     head_button: 3,
//!     ..ArbiterConfig::default()
//! };
//! let arbiter = CommandArbiter::new(config);
//! let sampler = InputSampler::new();
//!
//! let frame = sampler.on_device_sample(vec![0.0, 0.5], vec![true]);
//! arbiter.on_sample(&frame);
//!
//! let out = arbiter.tick(sampler.latest().as_ref(), Instant::now());
//! assert!((out.state.base.linear_x - 0.3).abs() < 1e-9);
//! ```

use std::sync::Mutex;
use std::time::Instant;

use teleop_types::{HeadCommand, JoySample, OutboundCommand, Twist};
use tracing::{debug, info};

use crate::config::{ArbiterConfig, SpeedScale, TORSO_DOWN_VELOCITY, TORSO_UP_VELOCITY};
use crate::head::HeadPose;
use crate::safety::GateState;
use crate::sampler::InputFrame;

// ─────────────────────────────────────────────────────────────────────────────
// Command state
// ─────────────────────────────────────────────────────────────────────────────

/// Which subsystem the sticks drive in a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Sticks drive the base.
    Base,
    /// Head-mode button held: sticks point the head, base is held at zero.
    Head,
}

impl ControlMode {
    pub fn of(sample: &JoySample, config: &ArbiterConfig) -> Self {
        if sample.button(config.head_button) {
            ControlMode::Head
        } else {
            ControlMode::Base
        }
    }
}

/// Everything the arbiter wants to command on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandState {
    pub base: Twist,
    pub torso: f64,
    pub head: HeadPose,
    /// `true` when the gate was engaged for this tick.
    pub deadman: bool,
}

/// Result of one [`CommandArbiter::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub gate: GateState,
    pub state: CommandState,
    /// Commands to hand to the transport, in base, torso, head order.
    pub commands: Vec<OutboundCommand>,
}

/// Derive the command state for one tick.
///
/// Pure: depends only on the gate decision, the latest frame and the current
/// integrated head pose.
pub fn compute_command(
    gate: GateState,
    frame: Option<&InputFrame>,
    head: HeadPose,
    config: &ArbiterConfig,
) -> CommandState {
    let sample = match (gate, frame) {
        (GateState::Engaged, Some(frame)) => &frame.sample,
        _ => {
            return CommandState {
                base: Twist::ZERO,
                torso: 0.0,
                head,
                deadman: false,
            };
        }
    };

    let base = match ControlMode::of(sample, config) {
        ControlMode::Base => base_velocity(sample, config),
        ControlMode::Head => Twist::ZERO,
    };

    CommandState {
        base,
        torso: torso_velocity(sample, config),
        head,
        deadman: true,
    }
}

fn base_velocity(sample: &JoySample, config: &ArbiterConfig) -> Twist {
    let scale: &SpeedScale = if sample.button(config.run_button) {
        &config.run
    } else {
        &config.nominal
    };
    let scaled = |axis: i32, max: f64| sample.axis(axis).map_or(0.0, |v| v * max);
    Twist {
        linear_x: scaled(config.axis_vx, scale.vx),
        linear_y: scaled(config.axis_vy, scale.vy),
        angular_z: scaled(config.axis_vw, scale.vw),
    }
}

/// Torso velocity for `sample`: zero unless exactly one of up/down is held.
pub fn torso_velocity(sample: &JoySample, config: &ArbiterConfig) -> f64 {
    let down = sample.button(config.torso_dn_button);
    let up = sample.button(config.torso_up_button);
    match (up, down) {
        (true, false) => TORSO_UP_VELOCITY,
        (false, true) => TORSO_DOWN_VELOCITY,
        _ => 0.0,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CommandArbiter
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the integrated head pose and applies the safety gate each tick.
///
/// Both entry points take `&self`; the head pose and the last gate decision
/// are behind mutexes so the sample callback and the tick may run on
/// different tasks.
#[derive(Debug)]
pub struct CommandArbiter {
    config: ArbiterConfig,
    head: Mutex<HeadPose>,
    last_gate: Mutex<GateState>,
}

impl CommandArbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            head: Mutex::new(HeadPose::default()),
            last_gate: Mutex::new(GateState::Disengaged),
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Current integrated head target.
    pub fn head_pose(&self) -> HeadPose {
        *self.head.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fold a freshly received frame into the integrated head pose.
    ///
    /// The gate is evaluated at the frame's own arrival time, so only the
    /// deadman decides here.  Disabled head axes leave their angle untouched.
    pub fn on_sample(&self, frame: &InputFrame) {
        let cfg = &self.config;
        let gate = cfg
            .safety
            .evaluate(Some(frame), cfg.deadman_button, frame.received_at);
        if !gate.is_engaged() || ControlMode::of(&frame.sample, cfg) != ControlMode::Head {
            return;
        }

        let mut head = self.head.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(v) = frame.sample.axis(cfg.axis_pan) {
            head.nudge_pan(v * cfg.pan_step, &cfg.head_limits);
        }
        if let Some(v) = frame.sample.axis(cfg.axis_tilt) {
            head.nudge_tilt(v * cfg.tilt_step, &cfg.head_limits);
        }
    }

    /// Evaluate the gate against `frame` at `now` and produce this tick's
    /// commands.
    pub fn tick(&self, frame: Option<&InputFrame>, now: Instant) -> TickOutput {
        let cfg = &self.config;
        let gate = cfg.safety.evaluate(frame, cfg.deadman_button, now);
        self.note_transition(gate);

        let state = compute_command(gate, frame, self.head_pose(), cfg);
        if gate.is_engaged() {
            if state.torso != 0.0 {
                debug!(
                    vx = state.base.linear_x,
                    vy = state.base.linear_y,
                    vw = state.base.angular_z,
                    pan = state.head.pan,
                    tilt = state.head.tilt,
                    torso = state.torso,
                    "teleop command"
                );
            } else {
                debug!(
                    vx = state.base.linear_x,
                    vy = state.base.linear_y,
                    vw = state.base.angular_z,
                    pan = state.head.pan,
                    tilt = state.head.tilt,
                    "teleop command"
                );
            }
        }

        TickOutput {
            gate,
            state,
            commands: self.commands_for(gate, &state),
        }
    }

    fn commands_for(&self, gate: GateState, state: &CommandState) -> Vec<OutboundCommand> {
        let cfg = &self.config;
        if !gate.is_engaged() && cfg.deadman_no_publish {
            return Vec::new();
        }
        let mut commands = vec![OutboundCommand::BaseVelocity(state.base)];
        if cfg.torso_enabled() {
            commands.push(OutboundCommand::TorsoVelocity(state.torso));
        }
        if cfg.head_enabled() {
            commands.push(OutboundCommand::Head(HeadCommand::new(
                cfg.head_format,
                state.head.pan,
                state.head.tilt,
            )));
        }
        commands
    }

    fn note_transition(&self, gate: GateState) {
        let mut last = self.last_gate.lock().unwrap_or_else(|e| e.into_inner());
        if *last != gate {
            info!(from = ?*last, to = ?gate, "safety gate changed");
            *last = gate;
        }
    }
}
