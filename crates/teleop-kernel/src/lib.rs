//! `teleop-kernel` – Safety & Arbitration
//!
//! Turns joystick samples into base, torso and head commands.  It does not
//! talk to any transport; it decides what may be sent and when.
//!
//! # Modules
//!
//! - [`sampler`] – [`InputSampler`][sampler::InputSampler]: last-value-wins
//!   store for the most recent device sample and its arrival time.
//! - [`safety`] – [`SafetyWindow`][safety::SafetyWindow]: the deadman and
//!   staleness gate that decides between [`GateState::Engaged`] and
//!   [`GateState::Disengaged`].
//! - [`head`] – [`HeadPose`][head::HeadPose]: the integrated pan/tilt target
//!   and its clamp limits.
//! - [`config`] – [`ArbiterConfig`][config::ArbiterConfig]: speed scales,
//!   axis/button bindings, head limits and publish policy.
//! - [`arbiter`] – [`CommandArbiter`][arbiter::CommandArbiter]: per-sample
//!   head integration and the per-tick command computation.
//! - [`keyboard`] – [`HeadStepper`][keyboard::HeadStepper]: WASD head
//!   pointing for terminals without a joystick.

pub mod arbiter;
pub mod config;
pub mod head;
pub mod keyboard;
pub mod safety;
pub mod sampler;

pub use arbiter::{CommandArbiter, CommandState, ControlMode, TickOutput, compute_command};
pub use config::ArbiterConfig;
pub use head::{HeadLimits, HeadPose};
pub use keyboard::{HeadKey, HeadStepper};
pub use safety::{GateState, SafetyWindow};
pub use sampler::{InputFrame, InputSampler};
