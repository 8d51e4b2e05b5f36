//! Turns the raw average frequency into the value which drives the animation.
use std::ops::Range;

/// Maps `value` linearly from `range` onto `[0, 1]`.
///
/// Values outside of `range` land outside of `[0, 1]`.
pub fn normalize(value: f32, range: &Range<f32>) -> f32 {
    (value - range.start) / (range.end - range.start)
}

/// See <https://easings.net/#easeInQuint>
pub fn ease_in_quint(x: f32) -> f32 {
    simple_easing::quint_in(x)
}

/// [normalize]s `value` and applies [ease_in_quint] afterwards.
///
/// # Example
/// ```
/// use lipsync_audio::easing::ease_normalized;
///
/// assert_eq!(ease_normalized(50., &(0.0..100.0)), 0.03125);
/// ```
pub fn ease_normalized(value: f32, range: &Range<f32>) -> f32 {
    ease_in_quint(normalize(value, range))
}
