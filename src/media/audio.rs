use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::process::{Bounded, run_bounded, run_in_slot};

/// Upper bound on the audio decode check.
const DECODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Audio track of an overlay that a recorder can mux into the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioRoute {
    /// Media file whose first audio stream is used.
    pub source: PathBuf,
}

impl AudioRoute {
    /// Route the audio of `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Fail with [`ComposeError::AudioRouting`] when the source can no longer be read.
    pub(crate) fn check_readable(&self) -> ComposeResult<()> {
        match std::fs::metadata(&self.source) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(ComposeError::audio_routing(format!(
                "audio source '{}' is not a file",
                self.source.display()
            ))),
            Err(e) => Err(ComposeError::audio_routing(format!(
                "audio source '{}' is unreadable: {e}",
                self.source.display()
            ))),
        }
    }

    /// Decode the first second of the source's first audio stream with `ffmpeg`.
    ///
    /// Fails with [`ComposeError::AudioRouting`] when the stream is missing or undecodable, so the
    /// caller can drop audio before an encode depends on it.
    pub(crate) fn check_decodable(&self) -> ComposeResult<()> {
        self.check_readable()?;
        let source = self.source.clone();
        let outcome = run_bounded(
            "repliq-audio-check",
            DECODE_CHECK_TIMEOUT,
            &CancelToken::new(),
            move |slot| {
                let mut cmd = Command::new("ffmpeg");
                cmd.args(["-hide_banner", "-v", "error", "-nostdin", "-i"])
                    .arg(&source)
                    .args(["-map", "0:a:0", "-t", "1", "-f", "null", "-"]);
                run_in_slot(&mut cmd, slot)
            },
        )
        .map_err(|e| ComposeError::audio_routing(format!("audio decode check failed: {e}")))?;
        let finished = match outcome {
            Bounded::Done(Ok(Some(finished))) => finished,
            Bounded::Done(Ok(None)) => {
                return Err(ComposeError::audio_routing("audio decode check was stopped"));
            }
            Bounded::Done(Err(e)) => {
                return Err(ComposeError::audio_routing(format!(
                    "failed to run ffmpeg for the audio decode check: {e}"
                )));
            }
            Bounded::TimedOut | Bounded::Cancelled => {
                return Err(ComposeError::audio_routing(format!(
                    "audio decode check did not finish within {} s",
                    DECODE_CHECK_TIMEOUT.as_secs()
                )));
            }
        };
        if !finished.status.success() {
            return Err(ComposeError::audio_routing(format!(
                "audio of '{}' cannot be decoded: {}",
                self.source.display(),
                String::from_utf8_lossy(&finished.stderr).trim()
            )));
        }
        Ok(())
    }
}
