//! Error types for the vision and servo control library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The servo bus could not be opened; actuator commands degrade to no-ops
    #[error("Servo hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// A write to an open servo bus failed
    #[error("Servo bus error: {0}")]
    Bus(String),

    /// Face detector failed on a frame
    #[error("Face detector error: {0}")]
    Detector(String),

    /// Speech output failed
    #[error("Announcement error: {0}")]
    Announcement(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
