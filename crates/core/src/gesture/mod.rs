use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;

pub const DEFAULT_PINCH_THRESHOLD_PX: f32 = 65.0;

/// Interaction mode reported to subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeLabel {
    #[default]
    Navigation,
    Drawing,
    Eraser,
    Selection,
}

impl ModeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Drawing => "drawing",
            Self::Eraser => "eraser",
            Self::Selection => "selection",
        }
    }
}

impl fmt::Display for ModeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension flag per digit, in thumb, index, middle, ring, pinky order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerState([bool; 5]);

impl FingerState {
    pub fn new(extended: [bool; 5]) -> Self {
        Self(extended)
    }

    /// Convenience constructor from 0/1 flags.
    pub fn from_bits(bits: [u8; 5]) -> Self {
        Self(bits.map(|bit| bit != 0))
    }

    pub fn as_array(&self) -> [bool; 5] {
        self.0
    }

    pub fn thumb(&self) -> bool {
        self.0[0]
    }

    pub fn index(&self) -> bool {
        self.0[1]
    }

    pub fn middle(&self) -> bool {
        self.0[2]
    }

    pub fn all_retracted(&self) -> bool {
        self.0.iter().all(|extended| !extended)
    }

    /// Index and middle both extended.
    pub fn two_up(&self) -> bool {
        self.index() && self.middle()
    }

    /// Index extended with the middle finger folded.
    pub fn pointing(&self) -> bool {
        self.index() && !self.middle()
    }
}

/// Finger-pattern rules, evaluated top to bottom. The first rule that
/// matches decides the label; patterns matching none fall back to
/// navigation. The pinch check in [`GestureClassifier::classify`] runs after
/// this table and overrides it.
const FINGER_RULES: [(fn(&FingerState) -> bool, ModeLabel); 3] = [
    (FingerState::all_retracted, ModeLabel::Eraser),
    (FingerState::two_up, ModeLabel::Navigation),
    (FingerState::pointing, ModeLabel::Drawing),
];

/// Maps a finger pattern plus pinch distance to a raw, per-frame mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureClassifier {
    pinch_threshold_px: f32,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PINCH_THRESHOLD_PX)
    }
}

impl From<&GestureConfig> for GestureClassifier {
    fn from(config: &GestureConfig) -> Self {
        Self::new(config.pinch_threshold_px)
    }
}

impl GestureClassifier {
    pub fn new(pinch_threshold_px: f32) -> Self {
        Self { pinch_threshold_px }
    }

    pub fn pinch_threshold_px(&self) -> f32 {
        self.pinch_threshold_px
    }

    pub fn classify(&self, fingers: FingerState, pinch_distance: f32) -> ModeLabel {
        let mode = finger_mode(&fingers);
        if pinch_distance < self.pinch_threshold_px {
            ModeLabel::Selection
        } else {
            mode
        }
    }
}

fn finger_mode(fingers: &FingerState) -> ModeLabel {
    FINGER_RULES
        .iter()
        .find(|(matches, _)| matches(fingers))
        .map(|(_, mode)| *mode)
        .unwrap_or_default()
}
