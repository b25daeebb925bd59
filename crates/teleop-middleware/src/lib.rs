//! `teleop-middleware` – The Nervous System
//!
//! Routes joystick samples in and controller commands out without caring
//! about what they mean.
//!
//! # Modules
//!
//! - [`bus`] – Typed, topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.
//! - [`transport`] – [`CommandTransport`] trait and the bus-backed
//!   [`BusTransport`] that tracks advertised channels.
//! - [`rosbridge`] – rosbridge-style WebSocket server: `joy` frames in,
//!   controller commands out.

pub mod bus;
pub mod rosbridge;
pub mod transport;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use rosbridge::RosbridgeServer;
pub use transport::{BusTransport, CommandTransport};
