//! Proportional pan/tilt control that keeps a detected face centred.
//!
//! The offset of the face centre from the frame centre is scaled by fixed
//! gains and sent to the pan and tilt servos as relative pulse-width moves.
//! There is no integral or derivative term and no deadband, so the head may
//! hunt slightly around the target. With no face the head holds position.

use crate::{
    constants::{PAN_GAIN, TILT_GAIN},
    face_detection::FaceDetector,
    servo_controller::ServoHandle,
    utils::safe_cast::f64_to_i32_trunc,
};
use log::{debug, trace, warn};
use opencv::{
    core::{Mat, Point2f, Rect},
    prelude::*,
};

/// Relative pulse-width command for the neck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoDelta {
    pub pan: i32,
    pub tilt: i32,
}

/// Gains and servo channels of the tracking loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingGains {
    /// Applied to the horizontal offset; negative because camera and pan axes are mirrored
    pub pan: f64,
    pub tilt: f64,
}

impl Default for TrackingGains {
    fn default() -> Self {
        Self {
            pan: PAN_GAIN,
            tilt: TILT_GAIN,
        }
    }
}

/// Face-following control loop
#[derive(Debug, Clone)]
pub struct FaceTracker {
    frame_centre: Point2f,
    gains: TrackingGains,
    pan_channel: u8,
    tilt_channel: u8,
}

/// Centre of a bounding box
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rect_centre(rect: &Rect) -> Point2f {
    Point2f::new(
        rect.x as f32 + rect.width as f32 / 2.0,
        rect.y as f32 + rect.height as f32 / 2.0,
    )
}

impl FaceTracker {
    /// The frame centre is computed once from the capture resolution
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(frame_width: i32, frame_height: i32, gains: TrackingGains, pan_channel: u8, tilt_channel: u8) -> Self {
        Self {
            frame_centre: Point2f::new((frame_width / 2) as f32, (frame_height / 2) as f32),
            gains,
            pan_channel,
            tilt_channel,
        }
    }

    #[must_use]
    pub const fn frame_centre(&self) -> Point2f {
        self.frame_centre
    }

    /// Servo moves that steer towards `face`, truncated toward zero
    #[must_use]
    pub fn servo_delta(&self, face: &Rect) -> ServoDelta {
        let centre = rect_centre(face);
        let dx = f64::from(centre.x - self.frame_centre.x);
        let dy = f64::from(centre.y - self.frame_centre.y);
        ServoDelta {
            pan: f64_to_i32_trunc(self.gains.pan * dx),
            tilt: f64_to_i32_trunc(self.gains.tilt * dy),
        }
    }

    /// Issue the moves for `face`, if any. Returns the moves computed.
    ///
    /// Moves are dropped rather than queued while the servo bank is backed up.
    pub fn steer(&self, face: Option<&Rect>, servos: &ServoHandle) -> Option<ServoDelta> {
        let face = face?;
        let delta = self.servo_delta(face);
        trace!("face at {:?}, steering pan {} tilt {}", face, delta.pan, delta.tilt);
        let pan_sent = servos.try_change_pw_relative(self.pan_channel, delta.pan);
        let tilt_sent = servos.try_change_pw_relative(self.tilt_channel, delta.tilt);
        if servos.is_connected() && !(pan_sent && tilt_sent) {
            debug!("servo queue full, tracking move skipped");
        }
        Some(delta)
    }

    /// Detect the face to follow in `grey`.
    ///
    /// A detector failure is logged and reads as "no face" for this frame only.
    pub fn locate(&self, detector: &mut dyn FaceDetector, grey: &Mat) -> Option<Rect> {
        if grey.empty() {
            return None;
        }
        match detector.detect(grey) {
            Ok(faces) => faces.into_iter().next(),
            Err(e) => {
                warn!("Face detection failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_sign_and_gain() {
        let tracker = FaceTracker::new(640, 480, TrackingGains::default(), 0, 10);
        // Face centre at (420, 290): 100 px right, 50 px below
        let delta = tracker.servo_delta(&Rect::new(370, 240, 100, 100));
        assert_eq!(delta, ServoDelta { pan: -10, tilt: 15 });
    }

    #[test]
    fn test_centred_face_gives_no_move() {
        let tracker = FaceTracker::new(640, 480, TrackingGains::default(), 0, 10);
        let delta = tracker.servo_delta(&Rect::new(270, 190, 100, 100));
        assert_eq!(delta, ServoDelta { pan: 0, tilt: 0 });
    }

    #[test]
    fn test_small_offsets_truncate_toward_zero() {
        let tracker = FaceTracker::new(640, 480, TrackingGains::default(), 0, 10);
        // 9 px left and 3 px up: -0.1 * -9 = 0.9 -> 0, 0.3 * -3 = -0.9 -> 0
        let delta = tracker.servo_delta(&Rect::new(261, 187, 100, 100));
        assert_eq!(delta, ServoDelta { pan: 0, tilt: 0 });
    }

    #[test]
    fn test_no_face_holds_position() {
        let tracker = FaceTracker::new(640, 480, TrackingGains::default(), 0, 10);
        assert!(tracker.steer(None, &ServoHandle::disconnected()).is_none());
    }
}
