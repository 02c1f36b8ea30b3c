//! Real-time movement event detection.
//!
//! A `GestureDetector` belongs to one tracked subject. Every raw pose goes
//! through the smoothing window, then all three rules are evaluated against
//! the smoothed pose and each rule's latch turns the condition into a
//! rising-edge event.
//!
//! Visibility gating reads confidence from the latest raw pose; positions
//! come from the smoothed pose.

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::DetectorConfig;
use crate::error::PoseError;
use crate::geometry::joint_angle;
use crate::latch::EdgeLatch;
use crate::pose::{Landmark, Pose, KEYPOINT_DIMS};
use crate::smoothing::SmoothingBuffer;

const ARMS: [(Landmark, Landmark); 2] = [
    (Landmark::LeftWrist, Landmark::LeftShoulder),
    (Landmark::RightWrist, Landmark::RightShoulder),
];

const LEGS: [(Landmark, Landmark, Landmark); 2] = [
    (Landmark::LeftHip, Landmark::LeftKnee, Landmark::LeftAnkle),
    (Landmark::RightHip, Landmark::RightKnee, Landmark::RightAnkle),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    ArmRaise,
    Squat,
    SitDown,
}

impl Gesture {
    pub const ALL: [Gesture; 3] = [Gesture::ArmRaise, Gesture::Squat, Gesture::SitDown];

    /// Event name as written to event logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArmRaise => "arm_raise",
            Self::Squat => "squat",
            Self::SitDown => "sit_down",
        }
    }
}

/// Per-update output. A field is true only on the update where that
/// gesture's event fired, not while it is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GestureEvents {
    pub arm_raise: bool,
    pub squat: bool,
    pub sit_down: bool,
}

impl GestureEvents {
    pub fn fired(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::ArmRaise => self.arm_raise,
            Gesture::Squat => self.squat,
            Gesture::SitDown => self.sit_down,
        }
    }

    pub fn any(&self) -> bool {
        self.arm_raise || self.squat || self.sit_down
    }

    /// Fired gestures in `Gesture::ALL` order.
    pub fn iter_fired(&self) -> impl Iterator<Item = Gesture> + '_ {
        Gesture::ALL.into_iter().filter(move |g| self.fired(*g))
    }
}

/// Hip height captured once, the first time the smoothing window fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HipBaseline {
    pub hip_y: f32,
}

/// Whether each rule's condition currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Conditions {
    arm_raise: bool,
    squat: bool,
    sit_down: bool,
}

pub struct GestureDetector {
    config: DetectorConfig,
    buffer: SmoothingBuffer,
    baseline: Option<HipBaseline>,
    arm_raise: EdgeLatch,
    squat: EdgeLatch,
    sit_down: EdgeLatch,
    frame_index: u64,
}

impl GestureDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let buffer = SmoothingBuffer::new(config.smoothing_window);
        Self {
            config,
            buffer,
            baseline: None,
            arm_raise: EdgeLatch::new(),
            squat: EdgeLatch::new(),
            sit_down: EdgeLatch::new(),
            frame_index: 0,
        }
    }

    /// Feed the next frame's raw pose, in temporal order.
    pub fn update(&mut self, raw: Pose) -> GestureEvents {
        let smoothed = self.buffer.push(raw);

        if self.baseline.is_none() && self.buffer.is_full() {
            self.calibrate(&smoothed);
        }

        let conditions = self.evaluate(&smoothed, &raw);
        let events = GestureEvents {
            arm_raise: self.arm_raise.observe(conditions.arm_raise),
            squat: self.squat.observe(conditions.squat),
            sit_down: self.sit_down.observe(conditions.sit_down),
        };

        for gesture in events.iter_fired() {
            debug!(frame = self.frame_index, event = gesture.as_str(), "gesture started");
        }
        self.frame_index += 1;

        events
    }

    /// [`update`](Self::update) from `[y, x, confidence]` rows.
    pub fn update_rows(
        &mut self,
        rows: &[[f32; KEYPOINT_DIMS]],
    ) -> Result<GestureEvents, PoseError> {
        let pose = Pose::from_rows(rows)?;
        Ok(self.update(pose))
    }

    /// [`update`](Self::update) from a raw model output tensor.
    pub fn update_tensor(
        &mut self,
        shape: &[usize],
        data: &[f32],
    ) -> Result<GestureEvents, PoseError> {
        let pose = Pose::from_tensor(shape, data)?;
        Ok(self.update(pose))
    }

    pub fn baseline(&self) -> Option<HipBaseline> {
        self.baseline
    }

    /// Whether a gesture's condition held on the latest update.
    pub fn is_active(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::ArmRaise => self.arm_raise.is_active(),
            Gesture::Squat => self.squat.is_active(),
            Gesture::SitDown => self.sit_down.is_active(),
        }
    }

    /// Forget the window, the baseline and every latch.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.baseline = None;
        self.arm_raise.reset();
        self.squat.reset();
        self.sit_down.reset();
        self.frame_index = 0;
    }

    fn calibrate(&mut self, smoothed: &Pose) {
        let hip_y = smoothed.hip_height();
        info!(frame = self.frame_index, hip_y, "hip baseline captured");
        self.baseline = Some(HipBaseline { hip_y });
    }

    fn evaluate(&self, smoothed: &Pose, latest: &Pose) -> Conditions {
        let thr = self.config.confidence_threshold;

        let arm_raise = ARMS.iter().any(|&(wrist, shoulder)| {
            latest[wrist].is_visible(thr)
                && latest[shoulder].is_visible(thr)
                && smoothed[wrist].y < smoothed[shoulder].y - self.config.arm_raise_margin
        });

        let knee_angle = self.mean_knee_angle(smoothed, latest);
        let hip_drop = self.baseline.map(|b| smoothed.hip_height() - b.hip_y);
        let hip_variance = self.buffer.hip_height_variance();
        trace!(?knee_angle, ?hip_drop, ?hip_variance, "leg metrics");

        let (squat, sit_down) = match (knee_angle, hip_drop) {
            (Some(angle), Some(drop)) => {
                let squat = angle < self.config.squat_max_knee_angle
                    && drop > self.config.squat_min_hip_drop;
                let settled = hip_variance.is_some_and(|v| v < self.config.sit_max_hip_variance);
                let sit_down = (self.config.sit_min_knee_angle..=self.config.sit_max_knee_angle)
                    .contains(&angle)
                    && drop > self.config.sit_min_hip_drop
                    && settled;
                (squat, sit_down)
            }
            _ => (false, false),
        };

        Conditions {
            arm_raise,
            squat,
            sit_down,
        }
    }

    /// Mean hip-knee-ankle angle over the legs whose three keypoints are
    /// visible; `None` when neither leg is.
    fn mean_knee_angle(&self, smoothed: &Pose, latest: &Pose) -> Option<f32> {
        let thr = self.config.confidence_threshold;
        let angles: Vec<f32> = LEGS
            .iter()
            .filter(|&&(hip, knee, ankle)| {
                [hip, knee, ankle].iter().all(|&l| latest[l].is_visible(thr))
            })
            .map(|&(hip, knee, ankle)| {
                joint_angle(&smoothed[hip], &smoothed[knee], &smoothed[ankle])
            })
            .collect();

        if angles.is_empty() {
            None
        } else {
            Some(angles.iter().sum::<f32>() / angles.len() as f32)
        }
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KEYPOINT_COUNT};

    /// Upright subject with arms at the sides and straight legs.
    fn standing() -> Pose {
        let points: [(f32, f32); KEYPOINT_COUNT] = [
            (0.10, 0.50),
            (0.08, 0.48),
            (0.08, 0.52),
            (0.09, 0.46),
            (0.09, 0.54),
            (0.20, 0.42),
            (0.20, 0.58),
            (0.32, 0.40),
            (0.32, 0.60),
            (0.44, 0.39),
            (0.44, 0.61),
            (0.45, 0.45),
            (0.45, 0.55),
            (0.65, 0.45),
            (0.65, 0.55),
            (0.85, 0.45),
            (0.85, 0.55),
        ];
        let mut keypoints = [Keypoint::default(); KEYPOINT_COUNT];
        for (kp, (y, x)) in keypoints.iter_mut().zip(points) {
            *kp = Keypoint::new(y, x, 0.9);
        }
        Pose::new(keypoints)
    }

    fn with_left_wrist_raised(mut pose: Pose) -> Pose {
        pose.keypoints_mut()[Landmark::LeftWrist as usize].y = 0.05;
        pose
    }

    /// Hips lowered by `drop` and knees bent so the leg angle is 90°.
    fn crouched(drop: f32) -> Pose {
        let mut pose = standing();
        let kps = pose.keypoints_mut();
        for (hip, knee, ankle) in LEGS {
            kps[hip as usize].y += drop;
            let (hy, hx) = kps[hip as usize].position();
            kps[knee as usize].y = hy + 0.15;
            kps[knee as usize].x = hx;
            kps[ankle as usize].y = hy + 0.15;
            kps[ankle as usize].x = if hx < 0.5 { hx - 0.15 } else { hx + 0.15 };
        }
        pose
    }

    fn set_confidence(pose: &mut Pose, landmark: Landmark, confidence: f32) {
        pose.keypoints_mut()[landmark as usize].confidence = confidence;
    }

    fn count(detector: &mut GestureDetector, pose: Pose, frames: usize, gesture: Gesture) -> usize {
        (0..frames).filter(|_| detector.update(pose).fired(gesture)).count()
    }

    #[test]
    fn test_arm_raise_fires_once_while_held() {
        let mut detector = GestureDetector::default();
        assert_eq!(count(&mut detector, standing(), 5, Gesture::ArmRaise), 0);
        assert_eq!(
            count(&mut detector, with_left_wrist_raised(standing()), 50, Gesture::ArmRaise),
            1
        );
        assert!(detector.is_active(Gesture::ArmRaise));
    }

    #[test]
    fn test_arm_raise_rearms_after_lowering() {
        let mut detector = GestureDetector::default();
        let raised = with_left_wrist_raised(standing());
        assert_eq!(count(&mut detector, raised, 10, Gesture::ArmRaise), 1);
        assert_eq!(count(&mut detector, standing(), 10, Gesture::ArmRaise), 0);
        assert!(!detector.is_active(Gesture::ArmRaise));
        assert_eq!(count(&mut detector, raised, 10, Gesture::ArmRaise), 1);
    }

    #[test]
    fn test_arm_raise_needs_no_baseline() {
        let mut detector = GestureDetector::default();
        let events = detector.update(with_left_wrist_raised(standing()));
        assert!(events.arm_raise);
        assert!(detector.baseline().is_none());
    }

    #[test]
    fn test_low_confidence_wrist_never_raises() {
        let mut detector = GestureDetector::default();
        let mut pose = with_left_wrist_raised(standing());
        set_confidence(&mut pose, Landmark::LeftWrist, 0.2);
        assert_eq!(count(&mut detector, pose, 30, Gesture::ArmRaise), 0);
    }

    #[test]
    fn test_gating_uses_latest_confidence() {
        let mut detector = GestureDetector::default();
        let raised = with_left_wrist_raised(standing());
        let mut hidden = raised;
        set_confidence(&mut hidden, Landmark::LeftShoulder, 0.0);

        assert!(detector.update(raised).arm_raise);
        // Smoothed position is still raised, but the shoulder just vanished.
        assert!(!detector.update(hidden).arm_raise);
        assert!(!detector.is_active(Gesture::ArmRaise));
        assert!(detector.update(raised).arm_raise);
    }

    #[test]
    fn test_baseline_captured_once_when_window_fills() {
        let mut detector = GestureDetector::default();
        for _ in 0..4 {
            detector.update(standing());
            assert!(detector.baseline().is_none());
        }
        detector.update(standing());
        let baseline = detector.baseline().unwrap();
        assert!((baseline.hip_y - 0.45).abs() < 1e-6);

        for _ in 0..20 {
            detector.update(crouched(0.1));
        }
        assert_eq!(detector.baseline(), Some(baseline));
    }

    #[test]
    fn test_squat_requires_baseline() {
        let mut detector = GestureDetector::default();
        let squat = crouched(0.1);
        for _ in 0..4 {
            assert!(!detector.update(squat).squat);
        }
    }

    #[test]
    fn test_squat_after_standing_start() {
        let mut detector = GestureDetector::default();
        assert_eq!(count(&mut detector, standing(), 10, Gesture::Squat), 0);
        assert_eq!(count(&mut detector, crouched(0.1), 30, Gesture::Squat), 1);
    }

    #[test]
    fn test_shallow_drop_is_not_a_squat() {
        let mut detector = GestureDetector::default();
        count(&mut detector, standing(), 10, Gesture::Squat);
        assert_eq!(count(&mut detector, crouched(0.03), 30, Gesture::Squat), 0);
    }

    #[test]
    fn test_one_visible_leg_is_enough() {
        let mut detector = GestureDetector::default();
        count(&mut detector, standing(), 10, Gesture::Squat);
        let mut pose = crouched(0.1);
        set_confidence(&mut pose, Landmark::RightAnkle, 0.0);
        assert_eq!(count(&mut detector, pose, 30, Gesture::Squat), 1);
    }

    #[test]
    fn test_invisible_legs_gate_leg_rules() {
        let mut detector = GestureDetector::default();
        count(&mut detector, standing(), 10, Gesture::Squat);
        let mut pose = crouched(0.1);
        set_confidence(&mut pose, Landmark::LeftKnee, 0.1);
        set_confidence(&mut pose, Landmark::RightKnee, 0.1);
        for _ in 0..30 {
            let events = detector.update(pose);
            assert!(!events.squat && !events.sit_down);
        }
    }

    #[test]
    fn test_sit_down_waits_for_stable_hips() {
        let mut detector = GestureDetector::default();
        count(&mut detector, standing(), 10, Gesture::SitDown);

        let seated = crouched(0.1);
        let mut fired_at = None;
        for i in 0..30 {
            if detector.update(seated).sit_down {
                assert!(fired_at.is_none(), "sit_down fired twice");
                fired_at = Some(i);
            }
        }
        // Raw hip heights only agree once the whole window holds the seated pose.
        assert_eq!(fired_at, Some(4));
    }

    #[test]
    fn test_sit_threshold_is_configurable() {
        let config = DetectorConfig {
            sit_min_hip_drop: 0.2,
            ..DetectorConfig::default()
        };
        let mut detector = GestureDetector::new(config);
        count(&mut detector, standing(), 10, Gesture::SitDown);
        assert_eq!(count(&mut detector, crouched(0.1), 30, Gesture::SitDown), 0);
    }

    #[test]
    fn test_update_rows_rejects_bad_shape() {
        let mut detector = GestureDetector::default();
        let rows = vec![[0.5, 0.5, 1.0]; 16];
        assert_eq!(
            detector.update_rows(&rows),
            Err(PoseError::InputShape { found: vec![16, 3] })
        );
    }

    #[test]
    fn test_update_tensor_accepts_batched_output() {
        let mut detector = GestureDetector::default();
        let flat: Vec<f32> = with_left_wrist_raised(standing())
            .to_rows()
            .iter()
            .flatten()
            .copied()
            .collect();

        let events = detector.update_tensor(&[1, 17, 3], &flat).unwrap();
        assert!(events.arm_raise);
        assert!(!detector.update_tensor(&[1, 1, 17, 3], &flat).unwrap().arm_raise);
        assert!(detector.is_active(Gesture::ArmRaise));
    }

    #[test]
    fn test_update_tensor_rejects_bad_shape() {
        let mut detector = GestureDetector::default();
        assert_eq!(
            detector.update_tensor(&[2, 17, 3], &[0.5; 2 * 17 * 3]),
            Err(PoseError::InputShape { found: vec![2, 17, 3] })
        );
        assert_eq!(
            detector.update_tensor(&[17, 4], &[0.5; 17 * 4]),
            Err(PoseError::InputShape { found: vec![17, 4] })
        );
        // Rejected frames never reach the window.
        for _ in 0..4 {
            detector.update(standing());
        }
        assert!(detector.baseline().is_none());
    }

    #[test]
    fn test_reset_forgets_baseline_and_latches() {
        let mut detector = GestureDetector::default();
        let raised = with_left_wrist_raised(standing());
        count(&mut detector, raised, 10, Gesture::ArmRaise);
        assert!(detector.baseline().is_some());

        detector.reset();
        assert!(detector.baseline().is_none());
        assert!(detector.update(raised).arm_raise);
    }

    #[test]
    fn test_event_names() {
        let names: Vec<&str> = Gesture::ALL.iter().map(Gesture::as_str).collect();
        assert_eq!(names, vec!["arm_raise", "squat", "sit_down"]);
    }
}
