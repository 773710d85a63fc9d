use std::sync::Arc;

use crate::background::BackgroundImage;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::model::request::BackgroundSource;

/// Decode an encoded image (PNG, JPEG, WebP, ...) into a premultiplied background.
pub fn decode_background(bytes: &[u8]) -> ComposeResult<BackgroundImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ComposeError::decode(format!("background image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ComposeError::decode("background image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(BackgroundImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Load a caller-supplied background.
pub fn load_background(source: &BackgroundSource) -> ComposeResult<BackgroundImage> {
    match source {
        BackgroundSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|e| {
                ComposeError::decode(format!(
                    "failed to read background '{}': {e}",
                    path.display()
                ))
            })?;
            decode_background(&bytes)
        }
        BackgroundSource::Bytes(bytes) => decode_background(bytes),
        BackgroundSource::Image(img) => {
            let expected = img.width as usize * img.height as usize * 4;
            if img.width == 0 || img.height == 0 || img.rgba8_premul.len() != expected {
                return Err(ComposeError::decode(
                    "background image byte length does not match its dimensions",
                ));
            }
            Ok(img.clone())
        }
    }
}
