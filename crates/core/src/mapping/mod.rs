use serde::{Deserialize, Serialize};

use crate::config::MappingConfig;

pub const DEFAULT_MARGIN: f32 = 0.15;

/// Expands the sub-range `[margin, 1 - margin]` of a normalised coordinate to
/// fill `[0, 1]`, saturating outside it.
pub fn map_axis(raw: f32, margin: f32) -> f32 {
    clamp01((raw - margin) / (1.0 - 2.0 * margin))
}

fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Normalised cursor position, always inside `[0, 1]` on both axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

impl CursorPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp01(x),
            y: clamp01(y),
        }
    }
}

/// Remaps raw landmark coordinates into cursor space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    margin: f32,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN)
    }
}

impl From<&MappingConfig> for CoordinateMapper {
    fn from(config: &MappingConfig) -> Self {
        Self::new(config.margin)
    }
}

impl CoordinateMapper {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn map(&self, raw: f32) -> f32 {
        map_axis(raw, self.margin)
    }

    pub fn map_point(&self, x: f32, y: f32) -> CursorPosition {
        CursorPosition::new(self.map(x), self.map(y))
    }
}
