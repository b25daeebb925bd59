//! rosbridge-style WebSocket server.
//!
//! [`RosbridgeServer`]:
//!
//! 1. **Ingests** `joy` publish frames from WebSocket clients (a gamepad page
//!    in a browser, a relay in front of a joystick driver, …) and republishes
//!    them as [`EventPayload::Joy`] events on [`Topic::Joy`].
//!
//! 2. **Forwards** every command event on [`Topic::Commands`] to all
//!    connected clients as a rosbridge `publish` frame addressed to the
//!    controller topic (`cmd_vel`, `torso_lift_controller/set_command`,
//!    `head_controller/command`, …).
//!
//! The server only translates shapes; it never inspects or filters the
//! commands it forwards.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use teleop_types::{
    Event, EventPayload, HeadCommand, JoySample, OutboundCommand, TeleopError,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, Topic};

/// Source tag for joy events that arrive over the bridge.
pub const JOY_SOURCE: &str = "teleop-middleware::rosbridge/joy";

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct InboundFrame {
    op: String,
    topic: String,
    #[serde(default)]
    msg: Option<Value>,
}

/// `sensor_msgs/Joy` sends buttons as integers; browser gamepads send bools.
#[derive(Deserialize)]
#[serde(untagged)]
enum ButtonValue {
    Flag(bool),
    Level(i64),
}

impl ButtonValue {
    fn pressed(&self) -> bool {
        match self {
            ButtonValue::Flag(b) => *b,
            ButtonValue::Level(v) => *v != 0,
        }
    }
}

#[derive(Deserialize)]
struct JoyMsg {
    #[serde(default)]
    axes: Vec<f64>,
    #[serde(default)]
    buttons: Vec<ButtonValue>,
}

/// Axis values are limited to `[-1.0, 1.0]` before they reach the kernel.
fn bound_axis(v: f64) -> f64 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Parse a rosbridge text frame into a joystick sample.
///
/// Returns `None` for anything other than a `publish` on `joy` (or `/joy`)
/// with a well-formed message.  Out-of-range axes are clamped.
pub fn parse_joy_frame(text: &str) -> Option<JoySample> {
    let frame: InboundFrame = serde_json::from_str(text).ok()?;
    if frame.op != "publish" || frame.topic.trim_start_matches('/') != "joy" {
        return None;
    }
    let msg: JoyMsg = serde_json::from_value(frame.msg?).ok()?;
    Some(JoySample::new(
        msg.axes.into_iter().map(bound_axis).collect(),
        msg.buttons.iter().map(ButtonValue::pressed).collect(),
    ))
}

/// Encode an outbound command as a rosbridge `publish` frame.
pub fn command_frame(command: &OutboundCommand) -> Value {
    let msg = match command {
        OutboundCommand::BaseVelocity(twist) => json!({
            "linear":  { "x": twist.linear_x, "y": twist.linear_y, "z": 0.0 },
            "angular": { "x": 0.0, "y": 0.0, "z": twist.angular_z }
        }),
        OutboundCommand::TorsoVelocity(v) => json!({ "data": v }),
        OutboundCommand::Head(HeadCommand::JointStates { joints }) => json!({
            "joints": joints
                .iter()
                .map(|j| json!({ "name": j.name, "position": j.position }))
                .collect::<Vec<_>>()
        }),
        OutboundCommand::Head(HeadCommand::CommandArray {
            names,
            positions,
            velocity,
            acc,
        }) => json!({
            "names": names,
            "positions": positions,
            "velocity": velocity,
            "acc": acc
        }),
    };
    json!({ "op": "publish", "topic": command.topic(), "msg": msg })
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// WebSocket endpoint bridging rosbridge clients and the [`EventBus`].
#[derive(Clone)]
pub struct RosbridgeServer {
    bus: Arc<EventBus>,
}

impl RosbridgeServer {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Bind the TCP listener.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::Config`] when the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<TcpListener, TeleopError> {
        TcpListener::bind(addr)
            .await
            .map_err(|e| TeleopError::Config(format!("rosbridge bind error on {addr}: {e}")))
    }

    /// Accept clients on `listener` forever.
    pub async fn serve(self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "rosbridge server listening");
        }
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_client(stream, peer).await {
                            error!(peer = %peer, error = %e, "rosbridge client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "rosbridge accept error");
                }
            }
        }
    }

    async fn handle_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), TeleopError> {
        let ws_stream = accept_async(stream).await.map_err(|e| {
            TeleopError::Serialization(format!("ws handshake from {peer}: {e}"))
        })?;
        info!(peer = %peer, "rosbridge client connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut commands = self.bus.subscribe_to(Topic::Commands);

        loop {
            tokio::select! {
                result = commands.recv() => {
                    match result {
                        Ok(Event { payload: EventPayload::Command(command), .. }) => {
                            let text = command_frame(&command).to_string();
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => {
                            warn!(peer = %peer, lagged_by = n, "rosbridge client lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        Some(Ok(Message::Text(text))) => {
                            self.handle_incoming(text.as_str());
                        }
                        _ => {}
                    }
                }
            }
        }

        info!(peer = %peer, "rosbridge client disconnected");
        Ok(())
    }

    /// Republish a `joy` frame on the bus; anything else is ignored.
    fn handle_incoming(&self, text: &str) {
        match parse_joy_frame(text) {
            Some(sample) => {
                self.bus
                    .publish_to(Topic::Joy, Event::new(JOY_SOURCE, EventPayload::Joy(sample)));
            }
            None => debug!(frame = text, "ignoring rosbridge frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_types::{HeadFormat, Twist};

    #[test]
    fn parses_joy_with_integer_buttons() {
        let sample = parse_joy_frame(
            r#"{"op":"publish","topic":"/joy","msg":{"axes":[0.0,0.5],"buttons":[0,1,0]}}"#,
        )
        .unwrap();
        assert_eq!(sample.axes, vec![0.0, 0.5]);
        assert_eq!(sample.buttons, vec![false, true, false]);
    }

    #[test]
    fn parses_joy_with_bool_buttons() {
        let sample = parse_joy_frame(
            r#"{"op":"publish","topic":"joy","msg":{"axes":[-1.0],"buttons":[true]}}"#,
        )
        .unwrap();
        assert_eq!(sample.buttons, vec![true]);
    }

    #[test]
    fn out_of_range_axes_are_clamped() {
        let sample = parse_joy_frame(
            r#"{"op":"publish","topic":"joy","msg":{"axes":[50.0,1e308,-7.5,0.25],"buttons":[1]}}"#,
        )
        .unwrap();
        assert_eq!(sample.axes, vec![1.0, 1.0, -1.0, 0.25]);
    }

    #[test]
    fn oversized_axis_cannot_exceed_max_speed() {
        use std::time::Instant;
        use teleop_kernel::{ArbiterConfig, CommandArbiter, InputSampler};

        let sample = parse_joy_frame(
            r#"{"op":"publish","topic":"joy","msg":{"axes":[50.0],"buttons":[1]}}"#,
        )
        .unwrap();
        let config = ArbiterConfig {
            axis_vx: 0,
            head_button: 3,
            ..ArbiterConfig::default()
        };
        let max_vx = config.nominal.vx;
        let arbiter = CommandArbiter::new(config);
        let sampler = InputSampler::new();
        let frame = sampler.record_at(sample, Instant::now());
        let out = arbiter.tick(Some(&frame), frame.received_at);
        assert!(out.gate.is_engaged());
        assert_eq!(out.state.base.linear_x, max_vx);
    }

    #[test]
    fn ignores_other_frames() {
        assert!(parse_joy_frame(r#"{"op":"subscribe","topic":"joy"}"#).is_none());
        assert!(parse_joy_frame(r#"{"op":"publish","topic":"cmd_vel","msg":{}}"#).is_none());
        assert!(parse_joy_frame(r#"{"op":"publish","topic":"joy"}"#).is_none());
        assert!(parse_joy_frame("not json").is_none());
    }

    #[test]
    fn twist_frame_shape() {
        let frame = command_frame(&OutboundCommand::BaseVelocity(Twist {
            linear_x: 0.3,
            linear_y: -0.1,
            angular_z: 0.2,
        }));
        assert_eq!(frame["op"], "publish");
        assert_eq!(frame["topic"], "cmd_vel");
        assert_eq!(frame["msg"]["linear"]["x"], 0.3);
        assert_eq!(frame["msg"]["linear"]["y"], -0.1);
        assert_eq!(frame["msg"]["angular"]["z"], 0.2);
    }

    #[test]
    fn head_frames_keep_joint_names() {
        let states = command_frame(&OutboundCommand::Head(HeadCommand::new(
            HeadFormat::JointStates,
            0.1,
            0.2,
        )));
        assert_eq!(states["topic"], "head_controller/command");
        assert_eq!(states["msg"]["joints"][0]["name"], "head_pan_joint");
        assert_eq!(states["msg"]["joints"][1]["name"], "head_tilt_joint");

        let array = command_frame(&OutboundCommand::Head(HeadCommand::new(
            HeadFormat::CommandArray,
            0.1,
            0.2,
        )));
        assert_eq!(array["topic"], "head_controller/set_command_array");
        assert_eq!(array["msg"]["names"][1], "head_tilt_joint");
        assert_eq!(array["msg"]["acc"][0], 0.0);
    }

    #[test]
    fn torso_frame_shape() {
        let frame = command_frame(&OutboundCommand::TorsoVelocity(-0.01));
        assert_eq!(frame["topic"], "torso_lift_controller/set_command");
        assert_eq!(frame["msg"]["data"], -0.01);
    }

    #[tokio::test]
    async fn incoming_joy_is_republished() {
        let bus = Arc::new(EventBus::default());
        let server = RosbridgeServer::new(Arc::clone(&bus));
        let mut rx = bus.subscribe_to(Topic::Joy);

        server.handle_incoming(r#"{"op":"publish","topic":"joy","msg":{"axes":[0.2],"buttons":[1]}}"#);
        server.handle_incoming(r#"{"op":"subscribe","topic":"/unknown"}"#);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, JOY_SOURCE);
        assert!(matches!(event.payload, EventPayload::Joy(ref s) if s.buttons == vec![true]));
        assert!(rx.try_recv().is_err());
    }
}
