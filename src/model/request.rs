use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::background::BackgroundImage;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ComposeError, ComposeResult};

/// Label rendered into synthesized backgrounds when none is supplied.
pub const PLACEHOLDER_LABEL: &str = "yourwebsite.com";

/// Overlay size policy relative to the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Small corner bubble.
    #[default]
    SmallBubble,
    /// Large corner bubble.
    BigBubble,
    /// Aspect-preserving panel (40% of canvas width).
    FullScreen,
}

/// Canvas corner the overlay is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    #[default]
    BottomRight,
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
}

/// Clip shape applied to the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    /// Circle inscribed in the overlay box.
    #[default]
    Circle,
    /// Rectangle with rounded corners.
    Rounded,
    /// Plain rectangle.
    Square,
}

impl DisplayMode {
    /// Wire name (`small-bubble`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmallBubble => "small-bubble",
            Self::BigBubble => "big-bubble",
            Self::FullScreen => "full-screen",
        }
    }
}

impl Position {
    /// Wire name (`bottom-right`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
        }
    }

    /// Parse a position, falling back to [`Position::BottomRight`] for unrecognized input.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub(crate) fn is_left(self) -> bool {
        matches!(self, Self::BottomLeft | Self::TopLeft)
    }

    pub(crate) fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

impl Shape {
    /// Wire name (`circle`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Rounded => "rounded",
            Self::Square => "square",
        }
    }
}

fn normalize_token(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['_', ' '], "-")
}

impl FromStr for DisplayMode {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "small-bubble" | "small" => Ok(Self::SmallBubble),
            "big-bubble" | "big" => Ok(Self::BigBubble),
            "full-screen" | "fullscreen" => Ok(Self::FullScreen),
            other => Err(ComposeError::validation(format!(
                "unknown display mode '{other}'"
            ))),
        }
    }
}

impl FromStr for Position {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            other => Err(ComposeError::validation(format!(
                "unknown position '{other}'"
            ))),
        }
    }
}

impl FromStr for Shape {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "circle" => Ok(Self::Circle),
            "rounded" => Ok(Self::Rounded),
            "square" => Ok(Self::Square),
            other => Err(ComposeError::validation(format!("unknown shape '{other}'"))),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the overlay clip comes from.
#[derive(Clone, Debug)]
pub enum OverlaySource {
    /// A video file on disk.
    Path(PathBuf),
    /// Raw container bytes. `extension` is a container hint such as `"mp4"` or `"webm"`.
    Bytes {
        /// Encoded video bytes.
        data: Arc<[u8]>,
        /// Container hint used for the staged file name.
        extension: String,
    },
    /// Base64 payload, optionally a `data:` URI.
    Base64(String),
}

impl OverlaySource {
    /// Short description for logs (never includes payload bytes).
    pub fn describe(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Bytes { data, extension } => format!("<{} bytes .{extension}>", data.len()),
            Self::Base64(s) => format!("<base64 {} chars>", s.len()),
        }
    }
}

/// Pre-rendered background supplied by the caller.
#[derive(Clone, Debug)]
pub enum BackgroundSource {
    /// An image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Arc<[u8]>),
    /// An already decoded image.
    Image(BackgroundImage),
}

/// Sink receiving integer percent-complete values.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Lead record fields the engine consumes.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Company name, preferred as the background label.
    pub company_name: Option<String>,
    /// Contact first name.
    pub first_name: Option<String>,
}

impl Lead {
    /// Label used for the synthesized background: company, then first name, then a placeholder.
    pub fn website_label(&self) -> String {
        [self.company_name.as_deref(), self.first_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER_LABEL)
            .to_string()
    }
}

/// Input contract of one composition.
#[derive(Clone)]
pub struct CompositionRequest {
    /// Overlay clip (required).
    pub overlay: OverlaySource,
    /// Optional pre-rendered background; synthesized when `None`.
    pub background: Option<BackgroundSource>,
    /// Cosmetic label for synthesized backgrounds.
    pub website_label: Option<String>,
    /// Overlay size policy, default [`DisplayMode::SmallBubble`].
    pub display_mode: Option<DisplayMode>,
    /// Overlay corner, default [`Position::BottomRight`].
    pub position: Option<Position>,
    /// Overlay clip shape, default [`Shape::Circle`].
    pub shape: Option<Shape>,
    /// Optional progress sink.
    pub progress: Option<ProgressSink>,
    /// Cancellation token observed throughout the composition.
    pub cancel: CancelToken,
}

impl fmt::Debug for CompositionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionRequest")
            .field("overlay", &self.overlay.describe())
            .field("background", &self.background.is_some())
            .field("website_label", &self.website_label)
            .field("display_mode", &self.display_mode)
            .field("position", &self.position)
            .field("shape", &self.shape)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CompositionRequest {
    /// Request with all optional parameters unset.
    pub fn new(overlay: OverlaySource) -> Self {
        Self {
            overlay,
            background: None,
            website_label: None,
            display_mode: None,
            position: None,
            shape: None,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Use a pre-rendered background.
    pub fn with_background(mut self, background: BackgroundSource) -> Self {
        self.background = Some(background);
        self
    }

    /// Set the synthesized background label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.website_label = Some(label.into());
        self
    }

    /// Derive the background label from a lead record.
    pub fn for_lead(self, lead: &Lead) -> Self {
        self.with_label(lead.website_label())
    }

    /// Set the display mode.
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = Some(mode);
        self
    }

    /// Set the overlay corner.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the overlay clip shape.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Attach a progress sink.
    pub fn with_progress(mut self, sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply parameter defaults.
    pub fn resolve(self) -> ComposeResult<ResolvedRequest> {
        if let OverlaySource::Bytes { data, .. } = &self.overlay
            && data.is_empty()
        {
            return Err(ComposeError::validation("overlay video bytes are empty"));
        }
        if let OverlaySource::Base64(s) = &self.overlay
            && s.trim().is_empty()
        {
            return Err(ComposeError::validation("overlay video payload is empty"));
        }

        let label = self
            .website_label
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER_LABEL)
            .to_string();

        Ok(ResolvedRequest {
            overlay: self.overlay,
            background: self.background,
            website_label: label,
            display_mode: self.display_mode.unwrap_or_default(),
            position: self.position.unwrap_or_default(),
            shape: self.shape.unwrap_or_default(),
            progress: self.progress,
            cancel: self.cancel,
        })
    }
}

/// A [`CompositionRequest`] with every default applied.
#[derive(Clone)]
pub struct ResolvedRequest {
    /// Overlay clip.
    pub overlay: OverlaySource,
    /// Optional pre-rendered background.
    pub background: Option<BackgroundSource>,
    /// Background label (never empty).
    pub website_label: String,
    /// Overlay size policy.
    pub display_mode: DisplayMode,
    /// Overlay corner.
    pub position: Position,
    /// Overlay clip shape.
    pub shape: Shape,
    /// Optional progress sink.
    pub progress: Option<ProgressSink>,
    /// Cancellation token.
    pub cancel: CancelToken,
}
