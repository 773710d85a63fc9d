//! Scrolling backdrops: synthesized "website" images and caller-supplied screenshots.

use std::sync::Arc;

/// Image decoding for caller-supplied backgrounds.
pub mod decode;
/// Synthetic website backdrop.
pub mod synth;

pub use decode::{decode_background, load_background};
pub use synth::synthesize_background;

/// A decoded background image, premultiplied RGBA8, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl BackgroundImage {
    /// Premultiplied pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba8_premul.get(off..off + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
