//! Checked and saturating numeric conversions

/// Interpret an `OpenCV` hierarchy link, where any negative value means "none"
#[must_use]
pub fn link_to_index(link: i32) -> Option<usize> {
    usize::try_from(link).ok()
}

/// Truncate toward zero into an i32, saturating at the i32 range
///
/// Non-finite input maps to 0 so a bad measurement never produces a command.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // `as` saturates for floats
pub fn f64_to_i32_trunc(value: f64) -> i32 {
    if value.is_finite() {
        value.trunc() as i32
    } else {
        0
    }
}

/// Clamp an i32 into `[min, max]` and narrow to u16
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)] // Clamping ensures the range
pub fn clamp_to_u16(value: i32, min: u16, max: u16) -> u16 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    value.clamp(i32::from(min), i32::from(max)) as u16
}
