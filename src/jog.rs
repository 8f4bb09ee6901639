//! Keyboard jogging of the head servos.
//!
//! Every key press becomes a handful of [`ServoHandle`] commands, so manual
//! moves share the serialized servo queue with the tracking loop.

use crate::{
    config::{JogConfig, RigConfig},
    servo::Joint,
    servo_controller::ServoHandle,
};
use log::debug;
use std::time::Duration;

const PAN: &[Joint] = &[Joint::Pan];
const TILT: &[Joint] = &[Joint::Tilt];
const MOUTH: &[Joint] = &[Joint::Mouth];
const EYES_TILT: &[Joint] = &[Joint::EyesTilt];
const EYES: &[Joint] = &[Joint::LeftEye, Joint::RightEye];

/// What a key asks the head to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogAction {
    /// Move each joint by `delta` microseconds
    Move { joints: &'static [Joint], delta: i32 },
    /// All servos off, then back to their initial pulse widths.
    /// Like every jog, everything but tilt is released afterwards.
    Reset,
}

impl JogAction {
    /// Map a key to its action, `None` for keys without one
    #[must_use]
    pub fn from_key(key: char, step: i32) -> Option<Self> {
        let (joints, sign) = match key {
            'a' => (PAN, 1),
            'd' => (PAN, -1),
            's' => (TILT, 1),
            'w' => (TILT, -1),
            'o' => (MOUTH, 1),
            'k' => (MOUTH, -1),
            '\'' => (EYES_TILT, 1),
            '/' => (EYES_TILT, -1),
            'z' => (EYES, 1),
            'x' => (EYES, -1),
            'r' => return Some(Self::Reset),
            _ => return None,
        };
        Some(Self::Move {
            joints,
            delta: step.saturating_mul(sign),
        })
    }
}

/// Turns key presses into servo commands
#[derive(Debug, Clone)]
pub struct Jogger {
    rig: RigConfig,
    step: i32,
    settle: Duration,
}

impl Jogger {
    #[must_use]
    pub fn new(rig: RigConfig, jog: &JogConfig) -> Self {
        Self {
            rig,
            step: jog.step,
            settle: jog.settle(),
        }
    }

    /// Handle one key press. Returns the action taken, if the key has one.
    pub fn handle_key(&self, key: char, servos: &ServoHandle) -> Option<JogAction> {
        let action = JogAction::from_key(key, self.step)?;
        debug!("Jog key '{key}': {action:?}");
        self.apply(action, servos);
        Some(action)
    }

    /// Send the commands for `action`
    pub fn apply(&self, action: JogAction, servos: &ServoHandle) {
        match action {
            JogAction::Move { joints, delta } => {
                for &joint in joints {
                    servos.change_pw_relative(self.rig.channel(joint), delta);
                }
            }
            JogAction::Reset => {
                for joint in Joint::ALL {
                    servos.set_off(self.rig.channel(joint));
                }
                servos.settle(self.settle);
                for joint in Joint::ALL {
                    servos.home(self.rig.channel(joint));
                }
            }
        }

        servos.settle(self.settle);
        // Tilt keeps holding the weight of the head
        for joint in Joint::RELEASED_AFTER_JOG {
            servos.set_off(self.rig.channel(joint));
        }
    }
}
