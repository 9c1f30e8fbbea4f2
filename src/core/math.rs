// Math utilities for composite evaluation

use glam::Vec2;

/// Magnitude above which an analog sample counts as an active (pressed) control
pub const PRESS_THRESHOLD: f32 = 0.5;

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Check if two f32 values are approximately equal
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Whether an analog magnitude crosses the press threshold
pub fn is_active(magnitude: f32) -> bool {
    magnitude > PRESS_THRESHOLD
}

/// Snap an analog sample to 0.0 or 1.0 using the press threshold
pub fn digital(value: f32) -> f32 {
    if is_active(value) {
        1.0
    } else {
        0.0
    }
}

/// Normalize a vector, returning zero for (near) zero-length input
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    if approx_equal(v.length_squared(), 0.0, f32::EPSILON) {
        Vec2::ZERO
    } else {
        v.normalize()
    }
}
