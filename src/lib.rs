//! Vision demo for an InMoov robot head.
//!
//! Two features run over a live camera feed:
//! - Face tracking: a Haar cascade finds a face and a proportional loop
//!   steers the neck servos to keep it centred.
//! - Finger counting: the frame is Otsu-thresholded, its contour hierarchy is
//!   searched for hand-shaped subtrees, and a count that holds for a few
//!   frames is spoken aloud.
//!
//! All servo traffic goes through a single worker that owns the bus, so the
//! tracking loop, keyboard jogging and the speaking mouth never race.
//!
//! # Examples
//!
//! ## Counting fingers in a contour tree
//!
//! ```
//! use inmoov_vision::{
//!     contour::ContourNode,
//!     count_stabilizer::{CountStabilizer, StabilizerState},
//!     hand_classifier::HandClassifier,
//! };
//! use opencv::core::Point;
//!
//! let square = |x: i32| vec![
//!     Point::new(x, 0), Point::new(x + 4, 0), Point::new(x + 4, 4), Point::new(x, 4),
//! ];
//! // A palm with one gap holding two finger blobs
//! let gap = ContourNode::new(square(10), vec![ContourNode::leaf(square(11)), ContourNode::leaf(square(12))]);
//! let palm = ContourNode::new(square(0), vec![gap]);
//! let frame = ContourNode::frame(64, 48, vec![palm]);
//!
//! let hands = HandClassifier::default().find_hands(&frame);
//! assert_eq!(hands.len(), 1);
//! assert_eq!(hands[0].fingers, 2);
//!
//! let stabilizer = CountStabilizer::default();
//! let mut state = StabilizerState::new();
//! assert_eq!(stabilizer.update(&mut state, &[2]), None);
//! assert_eq!(stabilizer.update(&mut state, &[2]), None);
//! assert_eq!(stabilizer.update(&mut state, &[2]).as_deref(), Some("2"));
//! ```
//!
//! ## Driving servos
//!
//! ```no_run
//! use inmoov_vision::{servo::Servo, servo_bus::MaestroBus, servo_controller::ServoController};
//!
//! # fn main() -> inmoov_vision::Result<()> {
//! let mut controller = ServoController::new();
//! controller.register_servo(Servo::new(0, 2100, 1500, 2700))?;
//! let servos = controller.start(|| MaestroBus::open("/dev/ttyACM0"))?;
//! servos.change_pw_relative(0, -50);
//! controller.close();
//! # Ok(())
//! # }
//! ```

/// Spoken announcements on a background worker
pub mod announcer;

/// Main application module
pub mod app;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Contour hierarchy extraction and geometry
pub mod contour;

/// Debouncing of per-frame finger counts
pub mod count_stabilizer;

/// Error types and result handling
pub mod error;

/// Face detection
pub mod face_detection;

/// Proportional face-following loop
pub mod face_tracking;

/// Topological hand detection over contour trees
pub mod hand_classifier;

/// Keyboard jogging of the head
pub mod jog;

/// Per-frame orchestration
pub mod pipeline;

/// Servo model and joint names
pub mod servo;

/// Physical servo bus
pub mod servo_bus;

/// Servo bank worker and command handles
pub mod servo_controller;

/// Numeric conversion helpers
pub mod utils;

/// Named background worker threads
pub mod worker;

pub use error::{Error, Result};
