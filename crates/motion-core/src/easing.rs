//! Progress easing.

/// Cubic ease-in-out over normalized progress `p in [0, 1]`.
pub fn ease_in_out_cubic(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if p < 0.5 {
        4.0 * p * p * p
    } else {
        let q = -2.0 * p + 2.0;
        1.0 - q * q * q / 2.0
    }
}

/// Apply easing when enabled, otherwise pass progress through.
pub fn maybe_ease(p: f64, enabled: bool) -> f64 {
    if enabled {
        ease_in_out_cubic(p)
    } else {
        p.clamp(0.0, 1.0)
    }
}
