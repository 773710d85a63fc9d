use std::fmt;

use crate::foundation::error::{ComposeError, ComposeResult, ErrorKind};

/// Lifecycle of one composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositionState {
    /// Waiting for overlay readiness and the background.
    Loading,
    /// Render loop running.
    Playing,
    /// Capture stopping, awaiting the recorder's output.
    Finalizing,
    /// Artifact produced.
    Done,
    /// Terminated with a failure of the given kind.
    Failed(ErrorKind),
}

impl CompositionState {
    /// Return `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for CompositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("loading"),
            Self::Playing => f.write_str("playing"),
            Self::Finalizing => f.write_str("finalizing"),
            Self::Done => f.write_str("done"),
            Self::Failed(kind) => write!(f, "failed({kind:?})"),
        }
    }
}

/// Validated state transitions; every change is logged at debug level.
#[derive(Debug)]
pub struct StateMachine {
    state: CompositionState,
    history: Vec<CompositionState>,
}

impl StateMachine {
    /// Machine in [`CompositionState::Loading`].
    pub fn new() -> Self {
        Self {
            state: CompositionState::Loading,
            history: vec![CompositionState::Loading],
        }
    }

    /// Current state.
    pub fn state(&self) -> CompositionState {
        self.state
    }

    /// Every state entered, in order.
    pub fn history(&self) -> &[CompositionState] {
        &self.history
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: CompositionState) -> ComposeResult<()> {
        use CompositionState::*;

        let allowed = matches!(
            (self.state, next),
            (Loading, Playing) | (Playing, Finalizing) | (Finalizing, Done)
        ) || (!self.state.is_terminal() && matches!(next, Failed(_)));
        if !allowed {
            return Err(ComposeError::Other(anyhow::anyhow!(
                "invalid composition state transition {} -> {}",
                self.state,
                next
            )));
        }
        tracing::debug!(from = %self.state, to = %next, "composition state");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Enter `Failed(kind)` unless already terminal.
    pub fn fail(&mut self, kind: ErrorKind) {
        if !self.state.is_terminal() {
            let _ = self.advance(CompositionState::Failed(kind));
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
