/// Easing functions.
pub mod ease;
/// Playback progress and background scroll math.
pub mod scroll;
