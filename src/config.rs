//! Configuration management for the vision demo

use crate::{
    constants::{
        ANNOUNCE_QUEUE_CAPACITY, ANNOUNCE_REPEAT_WINDOW_SECS, DEFAULT_FACE_CASCADE, DEFAULT_SERVO_DEVICE,
        JOG_STEP, MAX_CHILDLESS_CHILDREN, MAX_CHILDREN, MIN_CHILDREN, MIN_FACE_SIZE, MOUTH_CLOSED_PW,
        MOUTH_OPEN_PW, PAN_GAIN, SETTLE_MILLIS, STABLE_RUN_LENGTH, TILT_GAIN,
    },
    count_stabilizer::{CountStabilizer, Retrigger},
    face_tracking::TrackingGains,
    hand_classifier::HandSignature,
    servo::{Joint, Servo},
    servo_bus::MAX_TARGET_PW,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera configuration
    pub camera: CameraConfig,

    /// Servo bus configuration
    pub bus: BusConfig,

    /// Servo channels and limits of the head
    pub rig: RigConfig,

    /// Finger counting configuration
    pub counting: CountingConfig,

    /// Face tracking configuration
    pub tracking: TrackingConfig,

    /// Speech configuration
    pub announcer: AnnouncerConfig,

    /// Manual jog keys
    pub jog: JogConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Camera capture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera index
    pub index: i32,

    /// Requested frame width
    pub width: i32,

    /// Requested frame height
    pub height: i32,
}

/// Serial link to the servo controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Drive real servos
    pub enabled: bool,

    /// Serial device of the controller
    pub device: PathBuf,
}

/// One servo's channel and pulse-width limits, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoConfig {
    pub channel: u8,
    pub initial_pw: u16,
    pub min_pw: u16,
    pub max_pw: u16,
}

impl ServoConfig {
    const fn new(channel: u8, initial_pw: u16, min_pw: u16, max_pw: u16) -> Self {
        Self {
            channel,
            initial_pw,
            min_pw,
            max_pw,
        }
    }

    /// Build the servo model
    #[must_use]
    pub fn to_servo(&self) -> Servo {
        Servo::new(self.channel, self.initial_pw, self.min_pw, self.max_pw)
    }
}

/// The six servos of the head
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub pan: ServoConfig,
    pub tilt: ServoConfig,
    pub eyes_tilt: ServoConfig,
    pub left_eye: ServoConfig,
    pub right_eye: ServoConfig,
    pub mouth: ServoConfig,
}

impl RigConfig {
    #[must_use]
    pub const fn servo(&self, joint: Joint) -> &ServoConfig {
        match joint {
            Joint::Pan => &self.pan,
            Joint::Tilt => &self.tilt,
            Joint::EyesTilt => &self.eyes_tilt,
            Joint::LeftEye => &self.left_eye,
            Joint::RightEye => &self.right_eye,
            Joint::Mouth => &self.mouth,
        }
    }

    #[must_use]
    pub const fn channel(&self, joint: Joint) -> u8 {
        self.servo(joint).channel
    }
}

/// Finger counting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingConfig {
    /// Fewest children of a hand contour
    pub min_children: usize,

    /// Most children of a hand contour
    pub max_children: usize,

    /// Children of a hand contour allowed to be leaves
    pub max_childless_children: usize,

    /// Identical consecutive readings before announcing
    pub stable_frames: usize,

    /// Announce once per stable run, or every frame while stable
    pub retrigger: Retrigger,
}

impl CountingConfig {
    #[must_use]
    pub const fn signature(&self) -> HandSignature {
        HandSignature {
            min_children: self.min_children,
            max_children: self.max_children,
            max_childless_children: self.max_childless_children,
        }
    }

    #[must_use]
    pub fn stabilizer(&self) -> CountStabilizer {
        CountStabilizer::new(self.stable_frames, self.retrigger)
    }
}

/// Face tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Haar cascade file
    pub cascade: PathBuf,

    /// Smallest face size in pixels
    pub min_face_size: i32,

    /// Pulse-width change per pixel of horizontal offset
    pub pan_gain: f64,

    /// Pulse-width change per pixel of vertical offset
    pub tilt_gain: f64,
}

impl TrackingConfig {
    #[must_use]
    pub const fn gains(&self) -> TrackingGains {
        TrackingGains {
            pan: self.pan_gain,
            tilt: self.tilt_gain,
        }
    }
}

/// Speech output parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    /// Speak counts aloud
    pub enabled: bool,

    /// Text-to-speech program
    pub command: String,

    /// Arguments placed before the text
    pub args: Vec<String>,

    /// Identical messages inside this many seconds are not repeated
    pub repeat_window_secs: u64,

    /// Announcements queued while speaking before new ones are dropped
    pub queue_capacity: usize,

    /// Move the mouth while speaking
    pub animate_mouth: bool,

    /// Mouth pulse width while speaking
    pub mouth_open_pw: u16,

    /// Mouth pulse width after speaking
    pub mouth_closed_pw: u16,
}

impl AnnouncerConfig {
    #[must_use]
    pub const fn repeat_window(&self) -> Duration {
        Duration::from_secs(self.repeat_window_secs)
    }
}

/// Manual jog parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JogConfig {
    /// Pulse-width change per key press
    pub step: i32,

    /// Pause before releasing servos, in milliseconds
    pub settle_ms: u64,
}

impl JogConfig {
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window title
    pub window_title: String,

    /// Draw the pan/mode status line
    pub show_status: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: PathBuf::from(DEFAULT_SERVO_DEVICE),
        }
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            pan: ServoConfig::new(0, 2100, 1500, 2700),
            eyes_tilt: ServoConfig::new(2, 1900, 1600, 1950),
            left_eye: ServoConfig::new(4, 1650, 1400, 1650),
            right_eye: ServoConfig::new(6, 1950, 1700, 2100),
            mouth: ServoConfig::new(8, 1950, 1950, 2500),
            tilt: ServoConfig::new(10, 1900, 1100, 2400),
        }
    }
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            min_children: MIN_CHILDREN,
            max_children: MAX_CHILDREN,
            max_childless_children: MAX_CHILDLESS_CHILDREN,
            stable_frames: STABLE_RUN_LENGTH,
            retrigger: Retrigger::OncePerRun,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            cascade: PathBuf::from(DEFAULT_FACE_CASCADE),
            min_face_size: MIN_FACE_SIZE,
            pan_gain: PAN_GAIN,
            tilt_gain: TILT_GAIN,
        }
    }
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "say".to_string(),
            args: Vec::new(),
            repeat_window_secs: ANNOUNCE_REPEAT_WINDOW_SECS,
            queue_capacity: ANNOUNCE_QUEUE_CAPACITY,
            animate_mouth: true,
            mouth_open_pw: MOUTH_OPEN_PW,
            mouth_closed_pw: MOUTH_CLOSED_PW,
        }
    }
}

impl Default for JogConfig {
    fn default() -> Self {
        Self {
            step: JOG_STEP,
            settle_ms: SETTLE_MILLIS,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: "InMoov Vision".to_string(),
            show_status: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Camera
        if self.camera.width <= 0 || self.camera.height <= 0 {
            return Err(Error::ConfigError("Camera resolution must be positive".to_string()));
        }

        // Servo limits and channels
        let mut channels = BTreeSet::new();
        for joint in Joint::ALL {
            let servo = self.rig.servo(joint);
            if servo.min_pw > servo.max_pw {
                return Err(Error::ConfigError(format!(
                    "{joint:?} servo min_pw {} exceeds max_pw {}",
                    servo.min_pw, servo.max_pw
                )));
            }
            if servo.max_pw > MAX_TARGET_PW {
                return Err(Error::ConfigError(format!(
                    "{joint:?} servo max_pw {} exceeds the controller limit of {MAX_TARGET_PW}",
                    servo.max_pw
                )));
            }
            if !channels.insert(servo.channel) {
                return Err(Error::ConfigError(format!("Servo channel {} used twice", servo.channel)));
            }
        }

        // Counting
        if self.counting.min_children == 0 {
            return Err(Error::ConfigError("min_children must be at least 1".to_string()));
        }
        if self.counting.min_children > self.counting.max_children {
            return Err(Error::ConfigError(
                "min_children must not exceed max_children".to_string(),
            ));
        }
        if self.counting.stable_frames == 0 {
            return Err(Error::ConfigError("stable_frames must be greater than 0".to_string()));
        }

        // Tracking
        if self.tracking.min_face_size <= 0 {
            return Err(Error::ConfigError("min_face_size must be positive".to_string()));
        }
        if !self.tracking.pan_gain.is_finite() || !self.tracking.tilt_gain.is_finite() {
            return Err(Error::ConfigError("Tracking gains must be finite".to_string()));
        }

        // Announcer
        if self.announcer.queue_capacity == 0 {
            return Err(Error::ConfigError(
                "Announcer queue capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# InMoov Vision Configuration

# Camera capture
camera:
  index: 0
  width: 640
  height: 480

# Servo controller serial link
bus:
  enabled: true
  device: "/dev/ttyACM0"

# Servo channels and pulse-width limits (microseconds)
rig:
  pan:       { channel: 0,  initial_pw: 2100, min_pw: 1500, max_pw: 2700 }
  eyes_tilt: { channel: 2,  initial_pw: 1900, min_pw: 1600, max_pw: 1950 }
  left_eye:  { channel: 4,  initial_pw: 1650, min_pw: 1400, max_pw: 1650 }
  right_eye: { channel: 6,  initial_pw: 1950, min_pw: 1700, max_pw: 2100 }
  mouth:     { channel: 8,  initial_pw: 1950, min_pw: 1950, max_pw: 2500 }
  tilt:      { channel: 10, initial_pw: 1900, min_pw: 1100, max_pw: 2400 }

# Finger counting
counting:
  min_children: 1
  max_children: 5
  max_childless_children: 0
  stable_frames: 3
  retrigger: "once_per_run"   # or "every_frame"

# Face tracking
tracking:
  cascade: "/usr/share/opencv4/haarcascades/haarcascade_frontalface_alt2.xml"
  min_face_size: 80
  pan_gain: -0.1
  tilt_gain: 0.3

# Speech
announcer:
  enabled: true
  command: "say"              # e.g. "espeak" on Linux
  args: []
  repeat_window_secs: 5
  queue_capacity: 2
  animate_mouth: true
  mouth_open_pw: 2500
  mouth_closed_pw: 1850

# Manual jog keys
jog:
  step: 50
  settle_ms: 100

# Display
display:
  window_title: "InMoov Vision"
  show_status: true
"#;
