//! Model of a single hobby servo channel.
//!
//! A [`Servo`] tracks the commanded pulse width of one degree of freedom and
//! whether the channel is currently being driven. Commands never fail for
//! out-of-range input; the pulse width is clamped into the servo's bounds.

use crate::utils::safe_cast::clamp_to_u16;
use serde::{Deserialize, Serialize};

/// One physical servo on the head rig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Servo {
    channel: u8,
    pulse_width: u16,
    initial_pw: u16,
    min_pw: u16,
    max_pw: u16,
    powered: bool,
}

impl Servo {
    /// Create an unpowered servo resting at its initial pulse width.
    ///
    /// Bounds given in the wrong order are swapped, and an initial pulse width
    /// outside the bounds is clamped.
    #[must_use]
    pub fn new(channel: u8, initial_pw: u16, min_pw: u16, max_pw: u16) -> Self {
        let (min_pw, max_pw) = if min_pw <= max_pw { (min_pw, max_pw) } else { (max_pw, min_pw) };
        let initial_pw = initial_pw.clamp(min_pw, max_pw);
        Self {
            channel,
            pulse_width: initial_pw,
            initial_pw,
            min_pw,
            max_pw,
            powered: false,
        }
    }

    /// Set an absolute pulse width, clamped to bounds, and mark the servo powered
    pub fn set_pw(&mut self, pulse_width: i32) {
        self.pulse_width = clamp_to_u16(pulse_width, self.min_pw, self.max_pw);
        self.powered = true;
    }

    /// Move by `delta` from the current pulse width
    pub fn change_pw_relative(&mut self, delta: i32) {
        self.set_pw(i32::from(self.pulse_width).saturating_add(delta));
    }

    pub fn increment(&mut self, step: i32) {
        self.change_pw_relative(step);
    }

    pub fn decrement(&mut self, step: i32) {
        self.change_pw_relative(step.saturating_neg());
    }

    /// Stop driving the channel. The last pulse width is remembered.
    pub fn set_off(&mut self) {
        self.powered = false;
    }

    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    #[must_use]
    pub const fn pw(&self) -> u16 {
        self.pulse_width
    }

    #[must_use]
    pub const fn initial_pw(&self) -> u16 {
        self.initial_pw
    }

    #[must_use]
    pub const fn bounds(&self) -> (u16, u16) {
        (self.min_pw, self.max_pw)
    }

    #[must_use]
    pub const fn is_powered(&self) -> bool {
        self.powered
    }
}

/// Named joints of the head rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// Neck rotation left/right
    Pan,
    /// Neck nod up/down
    Tilt,
    /// Both eyes up/down
    EyesTilt,
    /// Left eye left/right
    LeftEye,
    /// Right eye left/right
    RightEye,
    /// Jaw
    Mouth,
}

impl Joint {
    /// Every joint, in rig order
    pub const ALL: [Self; 6] = [
        Self::Pan,
        Self::EyesTilt,
        Self::LeftEye,
        Self::RightEye,
        Self::Mouth,
        Self::Tilt,
    ];

    /// Joints released after a manual move. Tilt keeps holding the head up.
    pub const RELEASED_AFTER_JOG: [Self; 5] = [
        Self::Pan,
        Self::EyesTilt,
        Self::LeftEye,
        Self::RightEye,
        Self::Mouth,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_servo_is_unpowered_at_initial() {
        let servo = Servo::new(0, 2100, 1500, 2700);
        assert_eq!(servo.pw(), 2100);
        assert_eq!(servo.initial_pw(), 2100);
        assert!(!servo.is_powered());
    }

    #[test]
    fn test_set_pw_clamps_and_powers() {
        let mut servo = Servo::new(0, 2100, 1500, 2700);
        servo.set_pw(5000);
        assert_eq!(servo.pw(), 2700);
        assert!(servo.is_powered());

        servo.set_pw(-40);
        assert_eq!(servo.pw(), 1500);
    }

    #[test]
    fn test_relative_moves() {
        let mut servo = Servo::new(10, 1900, 1100, 2400);
        servo.increment(50);
        assert_eq!(servo.pw(), 1950);
        servo.decrement(100);
        assert_eq!(servo.pw(), 1850);
        servo.change_pw_relative(i32::MIN);
        assert_eq!(servo.pw(), 1100);
    }

    #[test]
    fn test_set_off_keeps_pulse_width() {
        let mut servo = Servo::new(8, 1950, 1950, 2500);
        servo.set_pw(2300);
        servo.set_off();
        assert!(!servo.is_powered());
        assert_eq!(servo.pw(), 2300);
    }

    #[test]
    fn test_initial_outside_bounds_is_clamped() {
        let servo = Servo::new(3, 1000, 2400, 1100);
        assert_eq!(servo.bounds(), (1100, 2400));
        assert_eq!(servo.pw(), 1100);
    }
}
