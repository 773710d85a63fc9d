use crate::foundation::error::{ComposeError, ComposeResult};

pub use kurbo::{BezPath, Point, Rect};

/// Tick rate as a rational `num/den`, so NTSC-style rates stay exact in ffmpeg arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Frames.
    pub num: u32,
    /// Seconds; never zero.
    pub den: u32,
}

impl Fps {
    /// Validated `num/den` rate.
    pub fn new(num: u32, den: u32) -> ComposeResult<Self> {
        if num == 0 || den == 0 {
            return Err(ComposeError::validation(format!(
                "frame rate {num}/{den} must have a non-zero numerator and denominator"
            )));
        }
        Ok(Self { num, den })
    }

    /// `per_second` frames per second.
    pub fn whole(per_second: u32) -> ComposeResult<Self> {
        Self::new(per_second, 1)
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Seconds between ticks.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Playback length of `frames` ticks.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Nearest whole tick count for `secs`; negative input gives 0.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

/// Pixel size of the output video or of a backdrop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// `width` x `height` pixels.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes in a tightly packed RGBA8 buffer of this size.
    pub fn rgba_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Reject sizes the renderer or a yuv420p encoder cannot take. `what` names the size in errors.
    pub fn validate_encodable(self, what: &str) -> ComposeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ComposeError::validation(format!(
                "{what} width/height must be non-zero"
            )));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ComposeError::validation(format!(
                "{what} width/height must be even (required for yuv420p output)"
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ComposeError::validation(format!("{what} dimensions exceed u16")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
