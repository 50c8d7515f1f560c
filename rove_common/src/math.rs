//! Math primitives for the control path.
//!
//! Pure, total functions. The symmetric clamp is the single safety-relevant
//! primitive: every voltage that reaches hardware passes through it.

/// Clamp `value` to the symmetric range `[-|bound|, +|bound|]`.
///
/// Returns `value` unchanged when `|value| <= |bound|`; otherwise returns
/// `±|bound|` with the sign of `value`.
#[inline]
pub fn clamp_abs(value: f64, bound: f64) -> f64 {
    let bound = bound.abs();
    if value > bound {
        bound
    } else if value < -bound {
        -bound
    } else {
        value
    }
}

/// Sign factor for direction inversion: `-1.0` when reversed, else `1.0`.
#[inline]
pub fn direction_factor(reversed: bool) -> f64 {
    if reversed { -1.0 } else { 1.0 }
}

// ─── Tests ──────────────────────────────────────────────────────────
