/// Encoded output of one composition.
///
/// The engine keeps no reference to the result once it is returned.
#[derive(Clone, Debug)]
pub struct CompositionResult {
    /// Encoded container bytes.
    pub data: Vec<u8>,
    /// MIME type of `data` (for example `video/webm`).
    pub mime_type: String,
    /// Playable duration in seconds, equal to the overlay clip's duration within one frame.
    pub duration_secs: f64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Number of video frames handed to the encoder.
    pub frame_count: u64,
    /// Whether the overlay's audio track was muxed into the output.
    pub has_audio: bool,
}

impl CompositionResult {
    /// Conventional file extension for [`CompositionResult::mime_type`].
    pub fn file_extension(&self) -> &'static str {
        let essence = self.mime_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            _ => "bin",
        }
    }
}
