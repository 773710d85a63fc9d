/// Curve mapping normalized progress to eased progress.
///
/// The backdrop scroll always uses [`Ease::InOutQuad`]; growth transitions can pick their own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    /// No easing.
    Linear,
    /// `2t²` below the midpoint, `1 - (-2t + 2)² / 2` above it.
    #[default]
    InOutQuad,
    /// `4t³` below the midpoint, `1 - (-2t + 2)³ / 2` above it.
    InOutCubic,
}

impl Ease {
    /// Eased value of `t`; input is clamped to `[0, 1]` and NaN maps to 0.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::InOutQuad if t < 0.5 => 2.0 * t * t,
            Self::InOutQuad => 1.0 - (2.0 - 2.0 * t).powi(2) / 2.0,
            Self::InOutCubic if t < 0.5 => 4.0 * t.powi(3),
            Self::InOutCubic => 1.0 - (2.0 - 2.0 * t).powi(3) / 2.0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
