use std::io::{Read, Write as _};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use crate::capture::recorder::{ChunkAssembler, Recorder, RecorderConfig, RecorderEvent};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::audio::AudioRoute;
use crate::render::frame::{FrameRGBA, flatten_premul_over_bg_to_opaque_rgba8};

const OUTPUT_CHUNK_BYTES: usize = 64 * 1024;

/// Video encoders in order of preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    /// VP9 in WebM (`libvpx-vp9`).
    Vp9,
    /// VP8 in WebM (`libvpx`).
    Vp8,
    /// H.264 in fragmented MP4 (`libx264`).
    H264,
}

impl VideoCodec {
    /// Preference order used by [`FfmpegRecorder::detect`].
    pub const PREFERENCE: [VideoCodec; 3] = [Self::Vp9, Self::Vp8, Self::H264];

    /// ffmpeg encoder name.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
            Self::H264 => "libx264",
        }
    }

    /// MIME type of the produced container.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Vp9 => "video/webm;codecs=vp9",
            Self::Vp8 => "video/webm;codecs=vp8",
            Self::H264 => "video/mp4",
        }
    }

    pub(crate) fn audio_encoder(self) -> &'static str {
        match self {
            Self::Vp9 | Self::Vp8 => "libopus",
            Self::H264 => "aac",
        }
    }

    pub(crate) fn push_output_args(self, cmd: &mut Command) {
        match self {
            Self::Vp9 => {
                cmd.args([
                    "-c:v",
                    "libvpx-vp9",
                    "-deadline",
                    "realtime",
                    "-cpu-used",
                    "8",
                    "-row-mt",
                    "1",
                ]);
            }
            Self::Vp8 => {
                cmd.args(["-c:v", "libvpx", "-deadline", "realtime", "-cpu-used", "8"]);
            }
            Self::H264 => {
                cmd.args(["-c:v", "libx264", "-preset", "veryfast"]);
            }
        }
    }

    pub(crate) fn push_container_args(self, cmd: &mut Command) {
        match self {
            Self::Vp9 | Self::Vp8 => {
                cmd.args(["-f", "webm"]);
            }
            // mp4 cannot seek back on a pipe, so write a fragmented stream.
            Self::H264 => {
                cmd.args(["-movflags", "frag_keyframe+empty_moov", "-f", "mp4"]);
            }
        }
    }
}

/// Encoders of `kind` (`'V'` or `'A'`) named in an `ffmpeg -encoders` listing.
fn listed_encoders(listing: &str, kind: char) -> Vec<&str> {
    listing
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let flags = cols.next()?;
            let name = cols.next()?;
            flags.starts_with(kind).then_some(name)
        })
        .collect()
}

/// Encoders a local `ffmpeg` offers for one composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderSupport {
    /// Most preferred available video codec.
    pub video: VideoCodec,
    /// Whether the matching audio encoder ([`VideoCodec`]'s `libopus` or `aac`) is listed.
    pub audio: bool,
}

/// Pick the most preferred codec listed by `ffmpeg -encoders`.
pub fn pick_codec(encoders_listing: &str) -> Option<VideoCodec> {
    pick_encoders(encoders_listing).map(|s| s.video)
}

/// Pick the preferred video codec and check that its audio encoder is listed too.
pub fn pick_encoders(encoders_listing: &str) -> Option<EncoderSupport> {
    let video = listed_encoders(encoders_listing, 'V');
    let codec = VideoCodec::PREFERENCE
        .into_iter()
        .find(|c| video.contains(&c.encoder()))?;
    let audio = listed_encoders(encoders_listing, 'A').contains(&codec.audio_encoder());
    Some(EncoderSupport {
        video: codec,
        audio,
    })
}

/// Ask the local `ffmpeg` for the most preferred available encoders.
///
/// Fails with [`ComposeError::RecorderUnavailable`] when ffmpeg is missing or has no video
/// encoder; a missing audio encoder is reported through [`EncoderSupport::audio`].
pub fn detect_encoders() -> ComposeResult<EncoderSupport> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| {
            ComposeError::recorder_unavailable(format!("ffmpeg was not found on PATH: {e}"))
        })?;
    if !out.status.success() {
        return Err(ComposeError::recorder_unavailable(format!(
            "ffmpeg -encoders exited with {}",
            out.status
        )));
    }
    let listing = String::from_utf8_lossy(&out.stdout);
    let support = pick_encoders(&listing).ok_or_else(|| {
        ComposeError::recorder_unavailable("ffmpeg has none of libvpx-vp9, libvpx or libx264")
    })?;
    tracing::debug!(
        encoder = support.video.encoder(),
        audio = support.audio,
        "selected encoders"
    );
    Ok(support)
}

/// [`detect_encoders`] without the audio half.
pub fn detect_codec() -> ComposeResult<VideoCodec> {
    detect_encoders().map(|s| s.video)
}

/// Fail with [`ComposeError::AudioRouting`] unless `route` can be muxed with `support`.
pub(crate) fn check_audio_route(support: EncoderSupport, route: &AudioRoute) -> ComposeResult<()> {
    if !support.audio {
        return Err(ComposeError::audio_routing(format!(
            "ffmpeg lacks the {} audio encoder",
            support.video.audio_encoder()
        )));
    }
    route.check_decodable()
}

/// Recorder that streams frames into a system `ffmpeg` and collects its stdout.
pub struct FfmpegRecorder {
    support: EncoderSupport,
    audio: Option<AudioRoute>,
    child: Arc<Mutex<Option<Child>>>,
    stdin: Option<ChildStdin>,
    events: Option<Receiver<RecorderEvent>>,
    drain: Option<std::thread::JoinHandle<()>>,
    scratch: Vec<u8>,
    cfg: Option<RecorderConfig>,
}

impl FfmpegRecorder {
    /// Recorder for a specific codec (no availability check).
    pub fn with_codec(codec: VideoCodec) -> Self {
        Self::with_support(EncoderSupport {
            video: codec,
            audio: true,
        })
    }

    /// Recorder for encoders reported by [`detect_encoders`].
    pub fn with_support(support: EncoderSupport) -> Self {
        Self {
            support,
            audio: None,
            child: Arc::new(Mutex::new(None)),
            stdin: None,
            events: None,
            drain: None,
            scratch: Vec::new(),
            cfg: None,
        }
    }

    /// Recorder for the encoders picked by [`detect_encoders`].
    pub fn detect() -> ComposeResult<Self> {
        Ok(Self::with_support(detect_encoders()?))
    }

    /// Selected codec.
    pub fn codec(&self) -> VideoCodec {
        self.support.video
    }

    /// `ffmpeg` invocation for `cfg`, reading raw frames on stdin and writing the container to
    /// stdout.
    ///
    /// Attached audio is padded with silence so the video alone bounds the output length.
    fn command(&self, cfg: &RecorderConfig) -> Command {
        let codec = self.support.video;
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
        ]);
        if let Some(audio) = &self.audio {
            cmd.arg("-i")
                .arg(&audio.source)
                .args(["-map", "0:v", "-map", "1:a:0"])
                .args(["-c:a", codec.audio_encoder(), "-af", "apad", "-shortest"]);
        } else {
            cmd.arg("-an");
        }
        codec.push_output_args(&mut cmd);
        cmd.args(["-pix_fmt", "yuv420p", "-b:v", &cfg.bitrate.to_string()]);
        codec.push_container_args(&mut cmd);
        cmd.arg("pipe:1");
        cmd
    }

    fn kill(&self) {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut c) = slot.take() {
            let _ = c.kill();
            let _ = c.wait();
        }
    }
}

impl Recorder for FfmpegRecorder {
    fn mime_type(&self) -> &str {
        self.support.video.mime_type()
    }

    fn attach_audio(&mut self, route: &AudioRoute) -> ComposeResult<()> {
        if self.cfg.is_some() {
            return Err(ComposeError::audio_routing(
                "audio must be attached before recording starts",
            ));
        }
        check_audio_route(self.support, route)?;
        self.audio = Some(route.clone());
        Ok(())
    }

    fn start(&mut self, cfg: RecorderConfig) -> ComposeResult<()> {
        if self.cfg.is_some() {
            return Err(ComposeError::encode("recorder already started"));
        }
        Canvas::new(cfg.width, cfg.height).validate_encodable("recorder")?;

        let mut cmd = self.command(&cfg);
        let mut child = cmd.spawn().map_err(|e| {
            ComposeError::recorder_unavailable(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ComposeError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ComposeError::encode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ComposeError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            let _ = stderr.read_to_end(&mut stderr_bytes);
            stderr_bytes
        });
        *self.child.lock().unwrap_or_else(|e| e.into_inner()) = Some(child);

        let (tx, rx) = mpsc::channel::<RecorderEvent>();
        let child_slot = Arc::clone(&self.child);
        let drain = std::thread::spawn(move || {
            let mut buf = vec![0u8; OUTPUT_CHUNK_BYTES];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(RecorderEvent::Data(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        let _ = tx.send(RecorderEvent::Error(format!(
                            "failed to read ffmpeg output: {e}"
                        )));
                        return;
                    }
                }
            }

            let status = child_slot
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
                .map(|mut c| c.wait());
            let stderr_bytes = stderr_drain.join().unwrap_or_default();
            let event = match status {
                Some(Ok(s)) if s.success() => RecorderEvent::Stopped,
                Some(Ok(s)) => RecorderEvent::Error(format!(
                    "ffmpeg exited with status {s}: {}",
                    String::from_utf8_lossy(&stderr_bytes).trim()
                )),
                Some(Err(e)) => {
                    RecorderEvent::Error(format!("failed to wait for ffmpeg to finish: {e}"))
                }
                None => RecorderEvent::Error("ffmpeg was terminated".to_owned()),
            };
            let _ = tx.send(event);
        });

        self.scratch = vec![0u8; Canvas::new(cfg.width, cfg.height).rgba_len()];
        self.stdin = Some(stdin);
        self.events = Some(rx);
        self.drain = Some(drain);
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRGBA) -> ComposeResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| ComposeError::encode("ffmpeg recorder not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ComposeError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.premultiplied {
            flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, [0, 0, 0, 255])?;
        } else if frame.data.len() == self.scratch.len() {
            self.scratch.copy_from_slice(&frame.data);
        } else {
            return Err(ComposeError::encode(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ComposeError::encode("ffmpeg recorder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ComposeError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn stop(&mut self) -> ComposeResult<Vec<u8>> {
        drop(self.stdin.take());
        let rx = self
            .events
            .take()
            .ok_or_else(|| ComposeError::encode("ffmpeg recorder not started"))?;
        let out = ChunkAssembler::new().drain(&rx);
        if let Some(handle) = self.drain.take() {
            let _ = handle.join();
        }
        self.cfg = None;
        out
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        self.kill();
        self.events = None;
        if let Some(handle) = self.drain.take() {
            let _ = handle.join();
        }
        self.cfg = None;
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.cfg.is_some() {
            self.abort();
        }
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
