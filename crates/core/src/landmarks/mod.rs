//! Hand landmark data as delivered by the external detector.
//!
//! Landmark ids follow the 21-point hand topology: wrist, then four joints
//! per digit from the base outwards.

use serde::{Deserialize, Serialize};

use crate::gesture::FingerState;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

pub const LANDMARK_COUNT: usize = 21;

/// Tip landmark of each digit, thumb first.
pub const FINGER_TIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl LandmarkPoint {
    pub fn new(id: u8, x: f32, y: f32) -> Self {
        Self { id, x, y, z: 0.0 }
    }

    /// Position in pixels for a frame of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl Default for Handedness {
    fn default() -> Self {
        Self::Right
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    #[serde(default)]
    pub handedness: Handedness,
    pub landmarks: Vec<LandmarkPoint>,
}

impl Hand {
    pub fn new(handedness: Handedness, landmarks: Vec<LandmarkPoint>) -> Self {
        Self {
            handedness,
            landmarks,
        }
    }

    /// A hand with fewer than 21 points cannot be classified and is treated
    /// as absent.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }

    pub fn landmark(&self, index: usize) -> Option<&LandmarkPoint> {
        self.landmarks.get(index)
    }

    /// Which digits are extended, judged in pixel space.
    ///
    /// The thumb compares its tip against the IP joint horizontally, in the
    /// direction given by handedness. The other fingers are extended when the
    /// tip sits above the PIP joint.
    pub fn finger_extension(&self, width: u32, height: u32) -> Option<FingerState> {
        if !self.is_complete() {
            return None;
        }
        let px = |index: usize| self.landmarks[index].to_pixels(width, height);

        let (thumb_tip_x, _) = px(THUMB_TIP);
        let (thumb_ip_x, _) = px(THUMB_IP);
        let thumb = match self.handedness {
            Handedness::Right => thumb_tip_x < thumb_ip_x,
            Handedness::Left => thumb_tip_x > thumb_ip_x,
        };

        let mut extended = [thumb, false, false, false, false];
        for (finger, &tip) in FINGER_TIPS.iter().enumerate().skip(1) {
            let (_, tip_y) = px(tip);
            let (_, joint_y) = px(tip - 2);
            extended[finger] = tip_y < joint_y;
        }
        Some(FingerState::new(extended))
    }

    /// Euclidean pixel distance between the thumb tip and the index tip.
    pub fn pinch_distance(&self, width: u32, height: u32) -> Option<f32> {
        let thumb = self.landmark(THUMB_TIP)?.to_pixels(width, height);
        let index = self.landmark(INDEX_TIP)?.to_pixels(width, height);
        Some((index.0 - thumb.0).hypot(index.1 - thumb.1))
    }

    fn mirror(&mut self) {
        for point in &mut self.landmarks {
            point.x = 1.0 - point.x;
        }
        self.handedness = self.handedness.opposite();
    }
}

/// One detector result: zero or more hands found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Frame size in pixels. Zero means unknown; the session then falls back
    /// to the configured capture resolution.
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub hands: Vec<Hand>,
}

impl DetectionFrame {
    pub fn new(width: u32, height: u32, hands: Vec<Hand>) -> Self {
        Self {
            width,
            height,
            hands,
        }
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, Vec::new())
    }

    /// The hand this pipeline tracks. Additional hands are ignored.
    pub fn primary_hand(&self) -> Option<&Hand> {
        self.hands.first().filter(|hand| hand.is_complete())
    }

    /// Returns the frame flipped horizontally. A mirrored right hand looks
    /// like a left hand, so handedness labels are swapped as well.
    pub fn mirrored(mut self) -> Self {
        for hand in &mut self.hands {
            hand.mirror();
        }
        self
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Builds an upright open hand around `(cx, cy)` with every digit
    /// extended. The index tip lands at `(cx - 0.03, cy - 0.1)`.
    pub fn hand_at(cx: f32, cy: f32, handedness: Handedness) -> Hand {
        let mut points = Vec::with_capacity(LANDMARK_COUNT);
        for id in 0..LANDMARK_COUNT {
            points.push(LandmarkPoint::new(id as u8, cx, cy));
        }
        let mut hand = Hand::new(handedness, points);

        hand.landmarks[WRIST].y = cy + 0.2;
        // Fingers extended: tips above the PIP joints.
        for (offset, &tip) in [-0.03f32, 0.0, 0.03, 0.06].iter().zip(&FINGER_TIPS[1..]) {
            for (depth, index) in (tip - 3..=tip).enumerate() {
                hand.landmarks[index].x = cx + offset;
                hand.landmarks[index].y = cy + 0.05 - depth as f32 * 0.05;
            }
        }
        // Thumb out to the side, pointing the "extended" direction.
        let side = match handedness {
            Handedness::Right => -1.0,
            Handedness::Left => 1.0,
        };
        for (depth, index) in (THUMB_CMC..=THUMB_TIP).enumerate() {
            hand.landmarks[index].x = cx + side * (0.05 + depth as f32 * 0.04);
            hand.landmarks[index].y = cy + 0.1;
        }
        hand
    }

    /// Folds the given digit so its tip drops below its PIP joint (or, for
    /// the thumb, crosses back over the IP joint).
    pub fn fold(hand: &mut Hand, finger: usize) {
        if finger == 0 {
            let ip = hand.landmarks[THUMB_IP];
            let tip = &mut hand.landmarks[THUMB_TIP];
            tip.x = ip.x - (tip.x - ip.x);
        } else {
            let tip = FINGER_TIPS[finger];
            let pip_y = hand.landmarks[tip - 2].y;
            hand.landmarks[tip].y = pip_y + 0.03;
        }
    }

    pub fn frame_with(hand: Hand) -> DetectionFrame {
        DetectionFrame::new(1080, 720, vec![hand])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn open_hand_has_all_fingers_extended() {
        for handedness in [Handedness::Left, Handedness::Right] {
            let hand = hand_at(0.5, 0.5, handedness);
            let fingers = hand.finger_extension(1080, 720).unwrap();
            assert_eq!(fingers.as_array(), [true; 5], "{handedness:?}");
        }
    }

    #[test]
    fn thumb_direction_depends_on_handedness() {
        let mut hand = hand_at(0.5, 0.5, Handedness::Right);
        assert!(hand.finger_extension(1080, 720).unwrap().thumb());

        hand.handedness = Handedness::Left;
        assert!(!hand.finger_extension(1080, 720).unwrap().thumb());
    }

    #[test]
    fn folded_fingers_are_retracted() {
        let mut hand = hand_at(0.5, 0.5, Handedness::Right);
        fold(&mut hand, 0);
        fold(&mut hand, 2);
        fold(&mut hand, 4);

        let fingers = hand.finger_extension(1080, 720).unwrap();
        assert_eq!(fingers.as_array(), [false, true, false, true, false]);
    }

    #[test]
    fn pinch_distance_is_measured_in_pixels() {
        let mut points: Vec<LandmarkPoint> = (0..LANDMARK_COUNT as u8)
            .map(|id| LandmarkPoint::new(id, 0.0, 0.0))
            .collect();
        points[THUMB_TIP] = LandmarkPoint::new(THUMB_TIP as u8, 0.1, 0.1);
        points[INDEX_TIP] = LandmarkPoint::new(INDEX_TIP as u8, 0.4, 0.5);
        let hand = Hand::new(Handedness::Right, points);

        let distance = hand.pinch_distance(100, 100).unwrap();
        assert!((distance - 50.0).abs() < 1e-3);
    }

    #[test]
    fn short_hands_are_not_classified() {
        let hand = Hand::new(Handedness::Right, vec![LandmarkPoint::new(0, 0.5, 0.5)]);
        assert!(hand.finger_extension(640, 480).is_none());
        assert!(hand.pinch_distance(640, 480).is_none());

        let frame = DetectionFrame::new(640, 480, vec![hand]);
        assert!(frame.primary_hand().is_none());
    }

    #[test]
    fn mirroring_flips_x_and_handedness() {
        let frame = frame_with(hand_at(0.3, 0.4, Handedness::Right)).mirrored();
        let tip = frame.hands[0].landmarks[INDEX_TIP];
        assert!((tip.x - 0.73).abs() < 1e-6);
        assert!((tip.y - 0.3).abs() < 1e-6);
        assert_eq!(frame.hands[0].handedness, Handedness::Left);

        let fingers = frame.hands[0].finger_extension(1080, 720).unwrap();
        assert!(fingers.thumb());
    }

    #[test]
    fn parses_detector_json() {
        let json = r#"{"width":640,"height":480,"hands":[{"handedness":"Left","landmarks":[{"id":0,"x":0.5,"y":0.5}]}]}"#;
        let frame: DetectionFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.hands[0].handedness, Handedness::Left);
        assert_eq!(frame.hands[0].landmarks[0].z, 0.0);
    }
}
