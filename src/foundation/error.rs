/// Result alias used across the composition engine.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Coarse failure category, stable across releases for logging and telemetry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The overlay video did not become ready within the load timeout.
    MediaLoadTimeout,
    /// The overlay video or background image failed to load or decode.
    MediaDecodeError,
    /// No streaming capture/encode facility is available.
    RecorderUnavailable,
    /// The recorder failed mid-capture.
    EncodeError,
    /// Audio could not be routed into the output. Never fatal.
    AudioRoutingFailure,
    /// The caller aborted the composition.
    Cancelled,
    /// Invalid request or configuration.
    Validation,
    /// Unexpected I/O or internal failure.
    Internal,
}

/// Structured composition failure carrying a kind and a human-readable message.
#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    /// See [`ErrorKind::MediaLoadTimeout`].
    #[error("media load timeout: {0}")]
    MediaLoadTimeout(String),

    /// See [`ErrorKind::MediaDecodeError`].
    #[error("media decode error: {0}")]
    MediaDecode(String),

    /// See [`ErrorKind::RecorderUnavailable`].
    #[error("recorder unavailable: {0}")]
    RecorderUnavailable(String),

    /// See [`ErrorKind::EncodeError`].
    #[error("encode error: {0}")]
    Encode(String),

    /// See [`ErrorKind::AudioRoutingFailure`].
    #[error("audio routing failure: {0}")]
    AudioRouting(String),

    /// See [`ErrorKind::Cancelled`].
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// See [`ErrorKind::Validation`].
    #[error("validation error: {0}")]
    Validation(String),

    /// See [`ErrorKind::Internal`].
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComposeError {
    /// Build a [`ComposeError::MediaLoadTimeout`].
    pub fn load_timeout(msg: impl Into<String>) -> Self {
        Self::MediaLoadTimeout(msg.into())
    }

    /// Build a [`ComposeError::MediaDecode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::MediaDecode(msg.into())
    }

    /// Build a [`ComposeError::RecorderUnavailable`].
    pub fn recorder_unavailable(msg: impl Into<String>) -> Self {
        Self::RecorderUnavailable(msg.into())
    }

    /// Build a [`ComposeError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ComposeError::AudioRouting`].
    pub fn audio_routing(msg: impl Into<String>) -> Self {
        Self::AudioRouting(msg.into())
    }

    /// Build a [`ComposeError::Cancelled`].
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Build a [`ComposeError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MediaLoadTimeout(_) => ErrorKind::MediaLoadTimeout,
            Self::MediaDecode(_) => ErrorKind::MediaDecodeError,
            Self::RecorderUnavailable(_) => ErrorKind::RecorderUnavailable,
            Self::Encode(_) => ErrorKind::EncodeError,
            Self::AudioRouting(_) => ErrorKind::AudioRoutingFailure,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Return `true` for failures that must not abort a composition.
    pub fn is_soft(&self) -> bool {
        self.kind() == ErrorKind::AudioRoutingFailure
    }
}
