//! Gesture Sentinel
//!
//! Movement analysis over 2D body keypoints from an external pose
//! estimator (17-point layout, `(y, x, confidence)` per keypoint):
//!
//! - live detection of `arm_raise`, `squat` and `sit_down` events from a
//!   smoothed keypoint stream, one [`GestureDetector`] per tracked subject;
//! - offline comparison of recorded sequences against a template with
//!   dynamic time warping, including the best-matching window inside a
//!   longer recording.
//!
//! # Example
//!
//! ```ignore
//! use gesture_sentinel::{GestureDetector, Pose};
//!
//! let mut detector = GestureDetector::default();
//! for rows in frames {
//!     let events = detector.update_rows(&rows)?;
//!     if events.squat {
//!         println!("squat");
//!     }
//! }
//! ```

pub mod config;
pub mod dtw;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod latch;
pub mod normalize;
pub mod pose;
pub mod smoothing;
pub mod source;


pub use config::{validate_frame_rate, Config, DetectorConfig, MatcherConfig};
pub use dtw::{best_window_match, distance, SequenceMatcher, StepCost, WindowMatch};
pub use error::PoseError;
pub use events::{detect_events, EventLog, EventRecord};
pub use geometry::angle;
pub use gesture::{Gesture, GestureDetector, GestureEvents, HipBaseline};
pub use normalize::{normalize, normalize_pose};
pub use pose::{Keypoint, Landmark, Pose, KEYPOINT_COUNT, SKELETON_EDGES};
pub use smoothing::SmoothingBuffer;
pub use source::{JsonSequenceSource, RecordedSequence, SequenceSource};
