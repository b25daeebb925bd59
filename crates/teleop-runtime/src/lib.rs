//! `teleop-runtime` – The Control Loop
//!
//! Wires the kernel to a transport and drives it in real time.
//!
//! # Modules
//!
//! - [`node`] – [`TeleopNode`][node::TeleopNode]: folds joystick samples
//!   into the [`InputSampler`][teleop_kernel::InputSampler] and
//!   [`CommandArbiter`][teleop_kernel::CommandArbiter] as they arrive, and
//!   ticks the arbiter at a fixed rate, handing every command to a
//!   [`CommandTransport`][teleop_middleware::CommandTransport].
//! - [`keyboard`] – [`drive_head_from_keys`][keyboard::drive_head_from_keys]:
//!   publishes head commands from a stream of typed characters.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.

pub mod keyboard;
pub mod node;
pub mod telemetry;

pub use keyboard::drive_head_from_keys;
pub use node::{NodeConfig, TeleopNode};
pub use telemetry::{TracerProviderGuard, init_tracing};
