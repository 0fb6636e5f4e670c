//! Chart color theme.

use serde::{Deserialize, Serialize};

/// Colors used by both the GPU pipelines and the UI overlay. All values are
/// linear RGBA in 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: [f32; 4],
    /// Bars that closed at or above their open.
    pub up: [f32; 4],
    /// Bars that closed below their open.
    pub down: [f32; 4],
    pub grid: [f32; 4],
    pub crosshair: [f32; 4],
    pub text: [f32; 4],
    /// Opacity applied to the volume strip.
    pub volume_opacity: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: [0.07, 0.08, 0.10, 1.0],
            up: [0.15, 0.68, 0.42, 1.0],
            down: [0.84, 0.29, 0.29, 1.0],
            grid: [0.30, 0.30, 0.35, 1.0],
            crosshair: [0.65, 0.65, 0.70, 1.0],
            text: [0.85, 0.85, 0.88, 1.0],
            volume_opacity: 0.45,
        }
    }

    pub fn light() -> Self {
        Self {
            background: [0.98, 0.98, 0.97, 1.0],
            up: [0.10, 0.60, 0.35, 1.0],
            down: [0.80, 0.22, 0.22, 1.0],
            grid: [0.82, 0.82, 0.84, 1.0],
            crosshair: [0.40, 0.40, 0.45, 1.0],
            text: [0.15, 0.15, 0.18, 1.0],
            volume_opacity: 0.45,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dark() {
        assert_eq!(Theme::default(), Theme::dark());
    }
}
