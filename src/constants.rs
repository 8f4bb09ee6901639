//! Constants used throughout the application

/// Fewest children a contour may have to be read as a hand
pub const MIN_CHILDREN: usize = 1;

/// Most children a contour may have to be read as a hand
pub const MAX_CHILDREN: usize = 5;

/// Children of a hand contour that are allowed to have no children themselves
pub const MAX_CHILDLESS_CHILDREN: usize = 0;

/// Consecutive identical readings required before a count is announced
pub const STABLE_RUN_LENGTH: usize = 3;

/// Proportional gain applied to the horizontal face offset (axes are mirrored)
pub const PAN_GAIN: f64 = -0.1;

/// Proportional gain applied to the vertical face offset
pub const TILT_GAIN: f64 = 0.3;

/// Smallest face, in pixels, the cascade will report
pub const MIN_FACE_SIZE: i32 = 80;

/// Identical announcements inside this window are suppressed
pub const ANNOUNCE_REPEAT_WINDOW_SECS: u64 = 5;

/// Pending announcements held before new ones are dropped
pub const ANNOUNCE_QUEUE_CAPACITY: usize = 2;

/// Pulse width step for one manual jog key press
pub const JOG_STEP: i32 = 50;

/// Delay before powering servos off after a move
pub const SETTLE_MILLIS: u64 = 100;

/// Mouth pulse widths while speaking
pub const MOUTH_OPEN_PW: u16 = 2500;
pub const MOUTH_CLOSED_PW: u16 = 1850;

/// Pending servo commands held by the bank worker
pub const SERVO_QUEUE_CAPACITY: usize = 64;

/// Hand outline stroke width
pub const OUTLINE_THICKNESS: i32 = 4;

/// Approximate cap height in pixels of `FONT_HERSHEY_SIMPLEX` at scale 1.0
pub const HERSHEY_SIMPLEX_HEIGHT: f64 = 22.0;

/// Default OpenCV Haar cascade for frontal faces
pub const DEFAULT_FACE_CASCADE: &str = "/usr/share/opencv4/haarcascades/haarcascade_frontalface_alt2.xml";

/// Default serial device of the servo controller
pub const DEFAULT_SERVO_DEVICE: &str = "/dev/ttyACM0";
