//! [`HeadStepper`] – keyboard head pointing.
//!
//! `W`/`S` tilt up/down by one tilt step, `A`/`D` pan left/right by one pan
//! step.  The pose is clamped after every key.  Nothing is published until
//! the first movement key; from then on every key press yields a command,
//! whether or not it moved the head.

use teleop_types::{HeadCommand, HeadFormat};

use crate::head::{HeadLimits, HeadPose};

/// A movement key recognised by the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadKey {
    TiltUp,
    TiltDown,
    PanLeft,
    PanRight,
}

impl HeadKey {
    /// Map a typed character to a movement key.  Only lower-case WASD moves
    /// the head.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(HeadKey::TiltUp),
            's' => Some(HeadKey::TiltDown),
            'a' => Some(HeadKey::PanLeft),
            'd' => Some(HeadKey::PanRight),
            _ => None,
        }
    }
}

/// Integrates key presses into a clamped head target.
#[derive(Debug, Clone)]
pub struct HeadStepper {
    pose: HeadPose,
    limits: HeadLimits,
    pan_step: f64,
    tilt_step: f64,
    dirty: bool,
}

impl HeadStepper {
    pub fn new(limits: HeadLimits, pan_step: f64, tilt_step: f64) -> Self {
        Self {
            pose: HeadPose::default(),
            limits,
            pan_step,
            tilt_step,
            dirty: false,
        }
    }

    pub fn pose(&self) -> HeadPose {
        self.pose
    }

    /// Apply one key press and return the command to publish, if any.
    pub fn press(&mut self, key: Option<HeadKey>) -> Option<HeadCommand> {
        match key {
            Some(HeadKey::TiltUp) => self.pose.nudge_tilt(self.tilt_step, &self.limits),
            Some(HeadKey::TiltDown) => self.pose.nudge_tilt(-self.tilt_step, &self.limits),
            Some(HeadKey::PanLeft) => self.pose.nudge_pan(self.pan_step, &self.limits),
            Some(HeadKey::PanRight) => self.pose.nudge_pan(-self.pan_step, &self.limits),
            None => {}
        }
        if key.is_some() {
            self.dirty = true;
        }
        self.dirty.then(|| {
            HeadCommand::new(HeadFormat::CommandArray, self.pose.pan, self.pose.tilt)
        })
    }
}
