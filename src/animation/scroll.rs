//! Pure per-tick math of the render loop: progress ratio, eased scroll offset and the
//! percent reported while playing.

use crate::animation::ease::Ease;

/// Easing applied to background scrolling and to full-screen growth.
pub const SCROLL_EASE: Ease = Ease::InOutQuad;

/// Resolve the duration used for progress math.
///
/// Unknown, non-finite or non-positive durations fall back to `fallback_secs`.
pub fn effective_duration(reported_secs: Option<f64>, fallback_secs: f64) -> f64 {
    reported_secs
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(fallback_secs)
}

/// `min(elapsed / duration, 1)`, clamped to `[0, 1]`.
pub fn playback_progress(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 1.0;
    }
    if !elapsed_secs.is_finite() {
        return 0.0;
    }
    (elapsed_secs / duration_secs).clamp(0.0, 1.0)
}

/// Distance the background can scroll: `max(0, bg_height - canvas_height)`.
pub fn scrollable_distance(background_height: f64, canvas_height: f64) -> f64 {
    (background_height - canvas_height).max(0.0)
}

/// Eased scroll offset for `progress`, bounded to `[0, scrollable_distance]`.
pub fn scroll_offset(progress: f64, background_height: f64, canvas_height: f64) -> f64 {
    let distance = scrollable_distance(background_height, canvas_height);
    (SCROLL_EASE.apply(progress) * distance).clamp(0.0, distance)
}

/// Percent reported while playing: `50 + round(45 * progress)`.
pub fn playing_percent(progress: f64) -> u8 {
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    50 + (45.0 * p).round() as u8
}
