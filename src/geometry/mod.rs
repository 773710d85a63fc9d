//! Overlay placement: destination box, clip path, content fit and full-screen growth.

/// Destination box resolution.
pub mod overlay;
/// Clip paths and content fit.
pub mod shape;
/// Time-varying overlay geometry.
pub mod transition;
