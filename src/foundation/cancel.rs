use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{ComposeError, ComposeResult};

/// Cooperative cancellation flag shared between a caller and one composition.
///
/// Clones observe the same flag. A [`CancelToken::child`] also observes its parent.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled together with `self`, whose own cancellation leaves `self` untouched.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::default(),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`CancelToken::cancel`] was called on any clone or on an ancestor.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Fail with [`ComposeError::Cancelled`] when cancellation was requested.
    pub fn check(&self, stage: &str) -> ComposeResult<()> {
        if self.is_cancelled() {
            return Err(ComposeError::cancelled(format!("cancelled during {stage}")));
        }
        Ok(())
    }
}
