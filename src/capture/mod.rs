//! Capture and encode: the recorder contract, an ffmpeg-backed recorder and the paced encoder
//! pipeline between the render loop and the recorder.

/// System `ffmpeg` recorder.
pub mod ffmpeg;
/// Encoder thread with frame pacing.
pub mod pipeline;
/// Recorder contract, chunk assembly and the in-memory recorder.
pub mod recorder;

pub use ffmpeg::{
    EncoderSupport, FfmpegRecorder, VideoCodec, detect_codec, detect_encoders, is_ffmpeg_on_path,
};
pub use pipeline::{CaptureOutput, CapturePipeline};
pub use recorder::{ChunkAssembler, Recorder, RecorderConfig, RecorderEvent};
#[doc(hidden)]
pub use recorder::{FRAME_LOG_MIME, InMemoryRecorder, RecorderProbe};
