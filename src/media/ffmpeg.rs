use std::path::{Path, PathBuf};
#[cfg(feature = "media-ffmpeg")]
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::Arc;

use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::audio::AudioRoute;
#[cfg(feature = "media-ffmpeg")]
use crate::media::process::run_in_slot;
use crate::media::process::ChildSlot;
use crate::media::source::{OverlayInfo, OverlayVideo, Readiness, VideoFrame};
use crate::media::staging::StagedOverlay;

/// Frame rate assumed when the container does not report one.
pub const FALLBACK_VIDEO_FPS: f64 = 30.0;

/// Frames decoded ahead of playback.
#[cfg(feature = "media-ffmpeg")]
const DECODE_QUEUE: usize = 4;

/// Probe overlay metadata through `ffprobe`.
///
/// A missing, zero or non-finite duration is reported as `None`.
pub fn probe_video(source_path: &Path) -> ComposeResult<OverlayInfo> {
    probe_video_in(source_path, &ChildSlot::default())
}

/// [`probe_video`] with the `ffprobe` child parked in `slot`, so closing the slot aborts it.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn probe_video_in(source_path: &Path, slot: &ChildSlot) -> ComposeResult<OverlayInfo> {
    let mut cmd = std::process::Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_streams",
        "-show_format",
    ])
    .arg(source_path);
    let out = run_in_slot(&mut cmd, slot)
        .map_err(|e| ComposeError::decode(format!("failed to run ffprobe: {e}")))?
        .ok_or_else(|| ComposeError::decode("ffprobe was stopped before it finished"))?;
    if !out.status.success() {
        return Err(ComposeError::decode(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

/// Overlay metadata from `ffprobe -print_format json -show_streams -show_format` output.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn parse_probe_json(json: &[u8]) -> ComposeResult<OverlayInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        avg_frame_rate: Option<String>,
        r_frame_rate: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ComposeError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ComposeError::decode("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ComposeError::decode("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ComposeError::decode("missing video height from ffprobe"))?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);
    let fps = [
        video_stream.avg_frame_rate.as_deref(),
        video_stream.r_frame_rate.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find_map(parse_rate);

    Ok(OverlayInfo {
        width,
        height,
        duration_secs,
        has_audio,
        fps,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub(crate) fn probe_video_in(_source_path: &Path, _slot: &ChildSlot) -> ComposeResult<OverlayInfo> {
    Err(ComposeError::decode(
        "overlay video decoding requires the 'media-ffmpeg' feature",
    ))
}

/// Parse an ffprobe rate such as `"30000/1001"`; `0/0` yields `None`.
pub(crate) fn parse_rate(s: &str) -> Option<f64> {
    let (num, den) = match s.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (s.trim().parse::<f64>().ok()?, 1.0),
    };
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

#[cfg(feature = "media-ffmpeg")]
enum DecodeMsg {
    Ready(OverlayInfo),
    Frame(VideoFrame),
    Eos,
    Failed(String),
}

/// Overlay clip decoded by an `ffmpeg` child process on a loader thread.
///
/// The loader probes the file, reports readiness, then waits for `play` before streaming raw
/// RGBA frames through a bounded channel.
pub struct FfmpegOverlay {
    staged: StagedOverlay,
    info: Option<OverlayInfo>,
    #[cfg(feature = "media-ffmpeg")]
    rx: Option<Receiver<DecodeMsg>>,
    #[cfg(feature = "media-ffmpeg")]
    start_tx: Option<SyncSender<()>>,
    child: Arc<ChildSlot>,
    loader: Option<std::thread::JoinHandle<()>>,
    current: Option<VideoFrame>,
    pending: Option<VideoFrame>,
    eos: bool,
    released: bool,
}

impl FfmpegOverlay {
    /// Spawn the loader for a staged overlay.
    #[cfg(feature = "media-ffmpeg")]
    pub(crate) fn open(staged: StagedOverlay) -> ComposeResult<Self> {
        let (tx, rx) = mpsc::sync_channel::<DecodeMsg>(DECODE_QUEUE);
        let (start_tx, start_rx) = mpsc::sync_channel::<()>(1);
        let child = Arc::new(ChildSlot::default());

        let path = staged.path().to_path_buf();
        let child_slot = Arc::clone(&child);
        let loader = std::thread::Builder::new()
            .name("repliq-overlay-decode".to_owned())
            .spawn(move || decode_thread(&path, &tx, &start_rx, &child_slot))
            .map_err(|e| ComposeError::decode(format!("failed to spawn decode thread: {e}")))?;

        Ok(Self {
            staged,
            info: None,
            rx: Some(rx),
            start_tx: Some(start_tx),
            child,
            loader: Some(loader),
            current: None,
            pending: None,
            eos: false,
            released: false,
        })
    }

    /// Spawn the loader for a staged overlay.
    #[cfg(not(feature = "media-ffmpeg"))]
    pub(crate) fn open(_staged: StagedOverlay) -> ComposeResult<Self> {
        Err(ComposeError::decode(
            "overlay video decoding requires the 'media-ffmpeg' feature",
        ))
    }

    /// Path the decoder reads from.
    pub fn path(&self) -> &Path {
        self.staged.path()
    }

    fn frame_duration(&self) -> f64 {
        1.0 / self
            .info
            .and_then(|i| i.fps)
            .unwrap_or(FALLBACK_VIDEO_FPS)
    }

    #[cfg(feature = "media-ffmpeg")]
    fn next_frame(&mut self) -> ComposeResult<Option<VideoFrame>> {
        if self.eos {
            return Ok(None);
        }
        let Some(rx) = self.rx.as_ref() else {
            return Ok(None);
        };
        match rx.recv() {
            Ok(DecodeMsg::Frame(frame)) => Ok(Some(frame)),
            Ok(DecodeMsg::Eos) | Err(_) => {
                self.eos = true;
                Ok(None)
            }
            Ok(DecodeMsg::Failed(msg)) => {
                self.eos = true;
                Err(ComposeError::decode(msg))
            }
            Ok(DecodeMsg::Ready(_)) => Ok(None),
        }
    }

    #[cfg(not(feature = "media-ffmpeg"))]
    fn next_frame(&mut self) -> ComposeResult<Option<VideoFrame>> {
        Ok(None)
    }
}

impl OverlayVideo for FfmpegOverlay {
    #[cfg(feature = "media-ffmpeg")]
    fn poll_ready(&mut self) -> ComposeResult<Readiness> {
        if let Some(info) = self.info {
            return Ok(Readiness::Ready(info));
        }
        let Some(rx) = self.rx.as_ref() else {
            return Err(ComposeError::decode("overlay video was released"));
        };
        match rx.try_recv() {
            Ok(DecodeMsg::Ready(info)) => {
                self.info = Some(info);
                Ok(Readiness::Ready(info))
            }
            Ok(DecodeMsg::Failed(msg)) => Err(ComposeError::decode(msg)),
            Ok(_) => Err(ComposeError::decode("decoder produced frames before metadata")),
            Err(TryRecvError::Empty) => Ok(Readiness::Pending),
            Err(TryRecvError::Disconnected) => {
                Err(ComposeError::decode("overlay decoder exited before ready"))
            }
        }
    }

    #[cfg(not(feature = "media-ffmpeg"))]
    fn poll_ready(&mut self) -> ComposeResult<Readiness> {
        Err(ComposeError::decode(
            "overlay video decoding requires the 'media-ffmpeg' feature",
        ))
    }

    fn play(&mut self) -> ComposeResult<()> {
        #[cfg(feature = "media-ffmpeg")]
        if let Some(start) = self.start_tx.take() {
            start
                .send(())
                .map_err(|_| ComposeError::decode("overlay decoder is gone"))?;
        }
        Ok(())
    }

    fn frame_at(&mut self, t_secs: f64) -> ComposeResult<Option<VideoFrame>> {
        let frame_dur = self.frame_duration();
        loop {
            if self.pending.is_none() {
                // Block only when the decoder is behind the playhead.
                let behind = self
                    .current
                    .as_ref()
                    .is_none_or(|c| c.pts_secs + frame_dur <= t_secs + 1e-9);
                if !behind {
                    break;
                }
                self.pending = self.next_frame()?;
                if self.pending.is_none() {
                    break;
                }
            }
            match self.pending.take() {
                Some(f) if f.pts_secs <= t_secs + 1e-9 => self.current = Some(f),
                other => {
                    self.pending = other;
                    break;
                }
            }
        }
        Ok(self.current.clone())
    }

    fn has_ended(&self, t_secs: f64) -> bool {
        if !self.eos || self.pending.is_some() {
            return false;
        }
        let last = self.current.as_ref().map_or(0.0, |f| f.pts_secs);
        t_secs >= last + self.frame_duration()
    }

    fn pause(&mut self) {
        self.child.close();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        #[cfg(feature = "media-ffmpeg")]
        {
            self.start_tx = None;
            self.rx = None;
        }
        // Every blocking point of the loader ends once its channels and process are gone.
        self.child.close();
        if let Some(handle) = self.loader.take() {
            let _ = handle.join();
        }
        self.current = None;
        self.pending = None;
        self.staged.revoke();
    }

    fn audio_route(&self) -> Option<AudioRoute> {
        self.info
            .filter(|i| i.has_audio)
            .map(|_| AudioRoute::new(PathBuf::from(self.staged.path())))
    }
}

impl Drop for FfmpegOverlay {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(feature = "media-ffmpeg")]
fn decode_thread(
    path: &Path,
    tx: &SyncSender<DecodeMsg>,
    start_rx: &Receiver<()>,
    child_slot: &ChildSlot,
) {
    use std::io::Read as _;
    use std::process::{Command, Stdio};

    use crate::foundation::math::premultiply_rgba8_in_place;

    let info = match probe_video_in(path, child_slot) {
        Ok(info) => info,
        Err(e) => {
            let _ = tx.send(DecodeMsg::Failed(e.to_string()));
            return;
        }
    };
    if tx.send(DecodeMsg::Ready(info)).is_err() {
        return;
    }
    if start_rx.recv().is_err() {
        return;
    }

    let fps = info.fps.unwrap_or(FALLBACK_VIDEO_FPS);
    let spawned = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-an", "-r", &format!("{fps:.6}")])
        .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(c) => c,
        Err(e) => {
            let _ = tx.send(DecodeMsg::Failed(format!(
                "failed to spawn ffmpeg for overlay decode: {e}"
            )));
            return;
        }
    };
    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill();
        let _ = tx.send(DecodeMsg::Failed("failed to open ffmpeg pipes".to_owned()));
        return;
    };
    let stderr_drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = stderr.read_to_end(&mut bytes);
        bytes
    });
    if !child_slot.install(child) {
        let _ = stderr_drain.join();
        return;
    }

    let frame_len = info.width as usize * info.height as usize * 4;
    let mut index = 0u64;
    loop {
        let mut buf = vec![0u8; frame_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                let _ = tx.send(DecodeMsg::Failed(format!("overlay decode read failed: {e}")));
                return;
            }
        }
        premultiply_rgba8_in_place(&mut buf);
        let frame = VideoFrame {
            width: info.width,
            height: info.height,
            rgba8_premul: Arc::new(buf),
            pts_secs: index as f64 / fps,
        };
        if tx.send(DecodeMsg::Frame(frame)).is_err() {
            return;
        }
        index += 1;
    }

    let status = child_slot.take().map(|mut c| c.wait());
    let stderr_bytes = stderr_drain.join().unwrap_or_default();
    let msg = match status {
        Some(Ok(s)) if !s.success() && index == 0 => DecodeMsg::Failed(format!(
            "ffmpeg overlay decode failed ({s}): {}",
            String::from_utf8_lossy(&stderr_bytes).trim()
        )),
        _ => DecodeMsg::Eos,
    };
    let _ = tx.send(msg);
}
