use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Joint name used for the head pan axis by downstream controllers.
pub const HEAD_PAN_JOINT: &str = "head_pan_joint";
/// Joint name used for the head tilt axis by downstream controllers.
pub const HEAD_TILT_JOINT: &str = "head_tilt_joint";

/// One raw sample from a joystick-style input device.
///
/// Indices are signed because configuration uses negative values to mean
/// "no control bound"; any index outside the sample reads as inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoySample {
    pub axes: Vec<f64>,
    pub buttons: Vec<bool>,
}

impl JoySample {
    pub fn new(axes: Vec<f64>, buttons: Vec<bool>) -> Self {
        Self { axes, buttons }
    }

    /// Value of axis `index`, or `None` when the index is negative or past the
    /// end of the sample.
    pub fn axis(&self, index: i32) -> Option<f64> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.axes.get(i).copied())
    }

    /// State of button `index`; out-of-range indices read as released.
    pub fn button(&self, index: i32) -> bool {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.buttons.get(i).copied())
            .unwrap_or(false)
    }
}

/// Planar base velocity command (`geometry_msgs/Twist` subset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear_x: f64,
    pub linear_y: f64,
    pub angular_z: f64,
}

impl Twist {
    pub const ZERO: Twist = Twist {
        linear_x: 0.0,
        linear_y: 0.0,
        angular_z: 0.0,
    };
}

/// A single named joint position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointPosition {
    pub name: String,
    pub position: f64,
}

/// Shape of the outbound head command expected by the head controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadFormat {
    /// Named joint-state list, positions only.
    #[default]
    JointStates,
    /// Joint command array with zero velocities and accelerations.
    CommandArray,
}

/// Head pan/tilt target in one of the two wire shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum HeadCommand {
    JointStates {
        joints: Vec<JointPosition>,
    },
    CommandArray {
        names: Vec<String>,
        positions: Vec<f64>,
        velocity: Vec<f64>,
        acc: Vec<f64>,
    },
}

impl HeadCommand {
    pub fn new(format: HeadFormat, pan: f64, tilt: f64) -> Self {
        match format {
            HeadFormat::JointStates => HeadCommand::JointStates {
                joints: vec![
                    JointPosition {
                        name: HEAD_PAN_JOINT.to_string(),
                        position: pan,
                    },
                    JointPosition {
                        name: HEAD_TILT_JOINT.to_string(),
                        position: tilt,
                    },
                ],
            },
            HeadFormat::CommandArray => HeadCommand::CommandArray {
                names: vec![HEAD_PAN_JOINT.to_string(), HEAD_TILT_JOINT.to_string()],
                positions: vec![pan, tilt],
                velocity: vec![0.0, 0.0],
                acc: vec![0.0, 0.0],
            },
        }
    }

    /// Controller topic this command shape is addressed to.
    pub fn topic(&self) -> &'static str {
        match self {
            HeadCommand::JointStates { .. } => "head_controller/command",
            HeadCommand::CommandArray { .. } => "head_controller/set_command_array",
        }
    }

    /// Position commanded for `joint`, if present.
    pub fn position_of(&self, joint: &str) -> Option<f64> {
        match self {
            HeadCommand::JointStates { joints } => joints
                .iter()
                .find(|j| j.name == joint)
                .map(|j| j.position),
            HeadCommand::CommandArray {
                names, positions, ..
            } => names
                .iter()
                .position(|n| n == joint)
                .and_then(|i| positions.get(i).copied()),
        }
    }
}

/// Outbound channels a teleop node can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    BaseVelocity,
    TorsoVelocity,
    Head,
}

/// One message addressed to an outbound channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "command")]
pub enum OutboundCommand {
    BaseVelocity(Twist),
    TorsoVelocity(f64),
    Head(HeadCommand),
}

impl OutboundCommand {
    pub fn channel(&self) -> Channel {
        match self {
            OutboundCommand::BaseVelocity(_) => Channel::BaseVelocity,
            OutboundCommand::TorsoVelocity(_) => Channel::TorsoVelocity,
            OutboundCommand::Head(_) => Channel::Head,
        }
    }

    /// Controller topic name the command is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            OutboundCommand::BaseVelocity(_) => "cmd_vel",
            OutboundCommand::TorsoVelocity(_) => "torso_lift_controller/set_command",
            OutboundCommand::Head(head) => head.topic(),
        }
    }
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "teleop-middleware::rosbridge/joy"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// Raw input-device sample.
    Joy(JoySample),
    /// Command emitted towards a controller.
    Command(OutboundCommand),
    /// Lifecycle notice (channel advertised/unadvertised, shutdown).
    SystemAlert { component: String, message: String },
}

#[derive(Error, Debug, Serialize, Deserialize)]
pub enum TeleopError {
    #[error("Transport Error on {channel:?}: {details}")]
    Transport { channel: Channel, details: String },

    #[error("Channel Not Advertised: {0:?}")]
    ChannelNotAdvertised(Channel),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Input Device Error: {0}")]
    Device(String),
}
