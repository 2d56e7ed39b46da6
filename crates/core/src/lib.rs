//! Core library for the Hand Cursor tracker.
//!
//! Turns per-frame hand landmarks from an external detector into a smoothed
//! cursor position and a debounced interaction mode, and fans the result out
//! to subscribers. Each module owns one stage of that pipeline: axis
//! filtering, coordinate mapping, gesture classification, mode
//! stabilisation, per-frame session orchestration and the broadcast loop.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod filter;
pub mod gesture;
pub mod landmarks;
pub mod mapping;
pub mod session;
pub mod source;
pub mod stabilizer;

pub use broadcast::{
    BroadcastLoop, DeliveryReport, LoopSummary, StopHandle, SubscriberId, SubscriberRegistry,
    Subscription,
};
pub use config::{
    AppConfig, BroadcastConfig, CaptureConfig, FilterConfig, GestureConfig, MappingConfig,
    StabilizerConfig,
};
pub use error::{HandCursorError, Result};
pub use filter::{AdaptiveAxisFilter, FilterState};
pub use gesture::{FingerState, GestureClassifier, ModeLabel};
pub use landmarks::{DetectionFrame, Hand, Handedness, LandmarkPoint};
pub use mapping::{map_axis, CoordinateMapper, CursorPosition};
pub use session::{FrameOutput, LandmarkOutput, TrackingSession};
pub use source::{FrameSource, ReplaySource, ScriptStep, ScriptedSource};
pub use stabilizer::ModeStabilizer;
