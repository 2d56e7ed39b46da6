//! Per-frame orchestration of the stabilisation pipeline.
//!
//! A session is either idle or tracking one hand. Filter and mode-window
//! state only exist while tracking; a single frame without a hand drops
//! them, so tracking always restarts cold after an occlusion.

use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, CaptureConfig, FilterConfig},
    filter::AdaptiveAxisFilter,
    gesture::{GestureClassifier, ModeLabel},
    landmarks::{DetectionFrame, Hand, INDEX_TIP},
    mapping::{CoordinateMapper, CursorPosition},
    stabilizer::ModeStabilizer,
    Result,
};

/// Landmark as sent to subscribers: normalised position only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkOutput {
    pub id: u8,
    pub x: f32,
    pub y: f32,
}

/// Message emitted once per processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    pub detected: bool,
    pub landmarks: Vec<LandmarkOutput>,
    pub mode: ModeLabel,
    pub cursor: CursorPosition,
}

impl FrameOutput {
    /// Output for a frame without a tracked hand.
    pub fn not_detected() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// State that lives only while a hand is being tracked.
#[derive(Debug, Clone)]
struct ActiveTrack {
    filter_x: AdaptiveAxisFilter,
    filter_y: AdaptiveAxisFilter,
    modes: ModeStabilizer,
}

impl ActiveTrack {
    fn new(params: FilterConfig, window: usize) -> Self {
        Self {
            filter_x: AdaptiveAxisFilter::new(params),
            filter_y: AdaptiveAxisFilter::new(params),
            modes: ModeStabilizer::new(window),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackingSession {
    mapper: CoordinateMapper,
    classifier: GestureClassifier,
    filter: FilterConfig,
    window: usize,
    mirror: bool,
    capture: CaptureConfig,
    track: Option<ActiveTrack>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl TrackingSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            mapper: CoordinateMapper::from(&config.mapping),
            classifier: GestureClassifier::from(&config.gesture),
            filter: config.filter,
            window: config.stabilizer.window,
            mirror: config.mapping.mirror,
            capture: config.capture,
            track: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.track.is_some()
    }

    /// Drops all filter and mode history.
    pub fn reset(&mut self) {
        if self.track.take().is_some() {
            tracing::info!("hand lost, tracking reset");
        }
    }

    /// Processes one detector result captured at `timestamp` seconds.
    pub fn step(&mut self, frame: &DetectionFrame, timestamp: f64) -> FrameOutput {
        let mirrored;
        let frame = if self.mirror {
            mirrored = frame.clone().mirrored();
            &mirrored
        } else {
            frame
        };

        let Some(hand) = frame.primary_hand() else {
            self.reset();
            return FrameOutput::not_detected();
        };

        let (width, height) = self.frame_size(frame);
        let (Some(fingers), Some(pinch)) = (
            hand.finger_extension(width, height),
            hand.pinch_distance(width, height),
        ) else {
            self.reset();
            return FrameOutput::not_detected();
        };

        let tip = hand.landmarks[INDEX_TIP];
        let target = self.mapper.map_point(tip.x, tip.y);

        let track = self.track.get_or_insert_with(|| {
            tracing::info!(hands = frame.hands.len(), "hand acquired, tracking started");
            ActiveTrack::new(self.filter, self.window)
        });

        let cursor = CursorPosition::new(
            track.filter_x.update(timestamp, target.x),
            track.filter_y.update(timestamp, target.y),
        );

        let raw_mode = self.classifier.classify(fingers, pinch);
        let mode = track.modes.push(raw_mode);

        tracing::debug!(
            raw = %raw_mode,
            stable = %mode,
            x = cursor.x,
            y = cursor.y,
            pinch,
            "frame processed"
        );

        FrameOutput {
            detected: true,
            landmarks: landmark_outputs(hand),
            mode,
            cursor,
        }
    }

    fn frame_size(&self, frame: &DetectionFrame) -> (u32, u32) {
        if frame.width == 0 || frame.height == 0 {
            (self.capture.width, self.capture.height)
        } else {
            (frame.width, frame.height)
        }
    }
}

fn landmark_outputs(hand: &Hand) -> Vec<LandmarkOutput> {
    hand.landmarks
        .iter()
        .map(|point| LandmarkOutput {
            id: point.id,
            x: point.x,
            y: point.y,
        })
        .collect()
}
