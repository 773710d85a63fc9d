//! Per-frame CPU compositing.

/// Canvas compositor (background slice, dimming, clipped overlay, outline).
pub mod compositor;
/// Output frame type and pixel helpers.
pub mod frame;

pub use compositor::{FrameCompositor, FrameStyle};
pub use frame::FrameRGBA;
