//! Utility helpers.

pub mod safe_cast;
