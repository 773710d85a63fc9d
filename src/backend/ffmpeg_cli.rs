use std::io::{BufRead as _, BufReader, Read as _};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::Context as _;

use crate::animation::scroll::{effective_duration, playing_percent};
use crate::background::{BackgroundImage, load_background, synthesize_background};
use crate::backend::filter_graph::{GraphParams, VIDEO_OUT, build_filter_graph};
use crate::backend::{ComposeContext, CompositionBackend};
use crate::capture::ffmpeg::{EncoderSupport, VideoCodec, check_audio_route, detect_encoders};
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::geometry::transition::OverlayTimeline;
use crate::media::audio::AudioRoute;
use crate::media::ffmpeg::probe_video_in;
use crate::media::process::{Bounded, run_bounded};
use crate::media::source::OverlayInfo;
use crate::media::staging::{StagedOverlay, TempFileGuard, stage_overlay, temp_path};
use crate::model::request::ResolvedRequest;
use crate::model::result::CompositionResult;
use crate::render::frame::{flatten_premul_over_bg_to_opaque_rgba8, save_rgba_png};
use crate::session::progress::{
    BACKGROUND_READY, LOAD_STARTED, PLAYBACK_STARTED, RECORDER_READY, VIDEO_READY,
};
use crate::session::state::CompositionState;

/// Composition through one `ffmpeg` invocation and a filter graph.
///
/// Rendering runs as fast as ffmpeg allows. Overlays keep their terminal geometry; growth
/// transitions are drawn by the canvas backend only.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegCliBackend {
    codec: Option<VideoCodec>,
}

impl FfmpegCliBackend {
    /// Backend that detects the best available encoder per composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pinned to `codec`.
    pub fn with_codec(codec: VideoCodec) -> Self {
        Self { codec: Some(codec) }
    }
}

/// Files prepared for the ffmpeg invocation. Temporary files are removed on drop.
#[derive(Debug)]
pub struct PreparedInputs {
    overlay: StagedOverlay,
    info: OverlayInfo,
    background_png: PathBuf,
    background_guard: TempFileGuard,
    background_size: (u32, u32),
    codec: VideoCodec,
    audio: bool,
}

impl PreparedInputs {
    /// Overlay metadata from `ffprobe`.
    pub fn info(&self) -> &OverlayInfo {
        &self.info
    }

    /// Selected encoder.
    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    /// Whether the overlay's audio will be muxed into the output.
    pub fn has_audio(&self) -> bool {
        self.audio
    }
}

/// Probe `path`, killing `ffprobe` when the load timeout passes or `cancel` fires.
fn probe_with_timeout(
    path: &Path,
    timeout: Duration,
    cancel: &CancelToken,
) -> ComposeResult<OverlayInfo> {
    let owned = path.to_path_buf();
    let outcome = run_bounded("repliq-probe", timeout, cancel, move |slot| {
        probe_video_in(&owned, slot)
    })
    .map_err(|e| ComposeError::decode(format!("overlay probe failed: {e}")))?;
    let info = match outcome {
        Bounded::Done(info) => info?,
        Bounded::TimedOut => {
            return Err(ComposeError::load_timeout(format!(
                "ffprobe did not finish within {} ms",
                timeout.as_millis()
            )));
        }
        Bounded::Cancelled => return Err(ComposeError::cancelled("cancelled during overlay load")),
    };
    if info.width == 0 || info.height == 0 {
        return Err(ComposeError::decode(
            "overlay video reports zero intrinsic size",
        ));
    }
    Ok(info)
}

fn write_background_png(
    bg: &BackgroundImage,
    clear_rgba: [u8; 4],
) -> ComposeResult<(PathBuf, TempFileGuard)> {
    let mut opaque = vec![0u8; bg.rgba8_premul.len()];
    flatten_premul_over_bg_to_opaque_rgba8(&mut opaque, &bg.rgba8_premul, clear_rgba)?;
    let path = temp_path("background", "png");
    let guard = TempFileGuard::new(path.clone());
    save_rgba_png(&path, &opaque, bg.width, bg.height)?;
    Ok((path, guard))
}

/// Load or synthesize the backdrop and write it as an opaque PNG input.
fn prepare_background(
    request: &ResolvedRequest,
    cx: &ComposeContext<'_>,
) -> ComposeResult<(PathBuf, TempFileGuard, (u32, u32))> {
    let bg = match &request.background {
        Some(source) => load_background(source)?,
        None => synthesize_background(Some(&request.website_label), cx.config.background_size),
    };
    let (path, guard) = write_background_png(&bg, cx.config.style.clear_rgba)?;
    Ok((path, guard, (bg.width, bg.height)))
}

/// Kills and reaps the child unless it was waited on.
struct ChildGuard(Option<Child>);

impl ChildGuard {
    fn wait(mut self) -> std::io::Result<std::process::ExitStatus> {
        match self.0.take() {
            Some(mut c) => c.wait(),
            None => Err(std::io::Error::other("ffmpeg already reaped")),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut c) = self.0.take() {
            let _ = c.kill();
            let _ = c.wait();
        }
    }
}

/// Fields of ffmpeg's `-progress` key/value stream.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct ProgressState {
    out_time_secs: f64,
    frames: u64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Both are microseconds; `out_time_ms` is misnamed by ffmpeg.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = (us / 1_000_000.0).max(0.0);
                }
            }
            "frame" => {
                if let Ok(n) = value.trim().parse::<u64>() {
                    self.frames = n;
                }
            }
            "progress" => self.complete = value.trim() == "end",
            _ => {}
        }
    }
}

impl CompositionBackend for FfmpegCliBackend {
    type Media = PreparedInputs;

    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn load_media(
        &self,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> ComposeResult<PreparedInputs> {
        cx.progress.report(LOAD_STARTED);
        let support = match self.codec {
            Some(codec) => EncoderSupport {
                video: codec,
                audio: true,
            },
            None => detect_encoders()?,
        };
        cx.progress.report(RECORDER_READY);

        // A background failure cancels the overlay wait; the parent token stays untouched.
        let overlay_cancel = cx.cancel.child();
        let (background, overlay) = rayon::join(
            || -> ComposeResult<(PathBuf, TempFileGuard, (u32, u32))> {
                let loaded = prepare_background(request, cx);
                match &loaded {
                    Ok(_) => cx.progress.report(BACKGROUND_READY),
                    Err(_) => overlay_cancel.cancel(),
                }
                loaded
            },
            || -> ComposeResult<(StagedOverlay, OverlayInfo)> {
                let staged = stage_overlay(&request.overlay)?;
                overlay_cancel.check("overlay load")?;
                let info =
                    probe_with_timeout(staged.path(), cx.config.load_timeout(), &overlay_cancel)?;
                cx.progress.report(VIDEO_READY);
                Ok((staged, info))
            },
        );
        // The background error is the cause whenever it cut the overlay load short.
        let (background_png, background_guard, background_size) = background?;
        let (overlay, info) = overlay?;

        let audio = info.has_audio
            && match check_audio_route(support, &AudioRoute::new(overlay.path())) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "continuing without overlay audio");
                    false
                }
            };

        Ok(PreparedInputs {
            overlay,
            info,
            background_png,
            background_guard,
            background_size,
            codec: support.video,
            audio,
        })
    }

    fn compute_geometry(
        &self,
        media: &PreparedInputs,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> OverlayTimeline {
        if cx.config.fullscreen_transition.is_some() {
            tracing::debug!("ffmpeg backend draws the terminal overlay box without growth");
        }
        let resolved = OverlayTimeline::resolve(
            request.display_mode,
            request.position,
            cx.config.canvas,
            media.info.width,
            media.info.height,
            cx.config.fullscreen_transition.as_ref(),
        );
        OverlayTimeline::fixed(resolved.terminal())
    }

    fn render_and_encode(
        &self,
        mut media: PreparedInputs,
        timeline: &OverlayTimeline,
        request: &ResolvedRequest,
        cx: &mut ComposeContext<'_>,
    ) -> ComposeResult<CompositionResult> {
        let canvas = cx.config.canvas;
        let fps = cx.config.output_fps()?;
        let duration_secs =
            effective_duration(media.info.duration_secs, cx.config.fallback_duration_secs);
        let graph = build_filter_graph(&GraphParams {
            canvas,
            background: media.background_size,
            overlay: timeline.terminal(),
            shape: request.shape,
            style: &cx.config.style,
            duration_secs,
            fps,
        });

        let extension = match media.codec {
            VideoCodec::Vp9 | VideoCodec::Vp8 => "webm",
            VideoCodec::H264 => "mp4",
        };
        let output = temp_path("output", extension);
        let _output_guard = TempFileGuard::new(output.clone());
        let rate = format!("{}/{}", fps.num, fps.den);

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
        ]);
        cmd.arg("-i").arg(media.overlay.path());
        cmd.args(["-loop", "1", "-framerate", &rate]);
        cmd.arg("-i").arg(&media.background_png);
        cmd.args(["-filter_complex", &graph, "-map", VIDEO_OUT]);
        if media.audio {
            cmd.args(["-map", "0:a:0", "-c:a", media.codec.audio_encoder()]);
        } else {
            cmd.arg("-an");
        }
        media.codec.push_output_args(&mut cmd);
        cmd.args([
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            &cx.config.video_bitrate.to_string(),
            "-r",
            &rate,
            "-t",
            &format!("{duration_secs:.6}"),
        ]);
        media.codec.push_container_args(&mut cmd);
        cmd.arg(&output);
        tracing::debug!(filter_len = graph.len(), duration_secs, "running ffmpeg filter graph");

        let mut child = cmd.spawn().map_err(|e| {
            ComposeError::recorder_unavailable(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ComposeError::encode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ComposeError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let child = ChildGuard(Some(child));
        let stderr_drain = std::thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        });

        cx.advance(CompositionState::Playing)?;
        cx.progress.report(PLAYBACK_STARTED);

        let mut state = ProgressState::default();
        let mut line = String::new();
        let mut reader = BufReader::new(stdout);
        loop {
            // Dropping the guard kills ffmpeg.
            cx.cancel.check("ffmpeg render")?;
            line.clear();
            let n = reader
                .read_line(&mut line)
                .context("failed to read ffmpeg progress")?;
            if n == 0 {
                break;
            }
            if let Some((key, value)) = line.trim().split_once('=') {
                state.update(key, value);
                if key == "progress" {
                    cx.progress
                        .report(playing_percent(state.out_time_secs / duration_secs));
                }
            }
        }

        cx.advance(CompositionState::Finalizing)?;
        let status = child
            .wait()
            .map_err(|e| ComposeError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_text = stderr_drain.join().unwrap_or_default();
        if !status.success() {
            return Err(ComposeError::encode(format!(
                "ffmpeg exited with status {status}: {}",
                stderr_text.trim()
            )));
        }

        let data = std::fs::read(&output)
            .with_context(|| format!("failed to read ffmpeg output '{}'", output.display()))?;
        media.overlay.revoke();
        media.background_guard.revoke();

        let frame_count = if state.frames > 0 {
            state.frames
        } else {
            fps.secs_to_frames_round(state.out_time_secs.min(duration_secs))
        };
        tracing::debug!(
            frame_count,
            bytes = data.len(),
            complete = state.complete,
            "ffmpeg finished"
        );
        Ok(CompositionResult {
            data,
            mime_type: media.codec.mime_type().to_owned(),
            duration_secs: fps.frames_to_secs(frame_count),
            width: canvas.width,
            height: canvas.height,
            frame_count,
            has_audio: media.audio,
        })
    }
}
