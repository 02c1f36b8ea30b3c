use std::ops::Index;

use crate::error::PoseError;

pub const KEYPOINT_COUNT: usize = 17;

/// Values per keypoint: `y`, `x`, `confidence`.
pub const KEYPOINT_DIMS: usize = 3;

/// Anatomical layout of the 17-point skeleton. Every gesture rule indexes
/// through this, so the discriminants must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

/// Limb connections, for renderers that draw the skeleton.
pub const SKELETON_EDGES: [(Landmark, Landmark); 18] = [
    (Landmark::Nose, Landmark::LeftEye),
    (Landmark::Nose, Landmark::RightEye),
    (Landmark::LeftEye, Landmark::LeftEar),
    (Landmark::RightEye, Landmark::RightEar),
    (Landmark::Nose, Landmark::LeftShoulder),
    (Landmark::Nose, Landmark::RightShoulder),
    (Landmark::LeftShoulder, Landmark::LeftElbow),
    (Landmark::LeftElbow, Landmark::LeftWrist),
    (Landmark::RightShoulder, Landmark::RightElbow),
    (Landmark::RightElbow, Landmark::RightWrist),
    (Landmark::LeftShoulder, Landmark::RightShoulder),
    (Landmark::LeftShoulder, Landmark::LeftHip),
    (Landmark::RightShoulder, Landmark::RightHip),
    (Landmark::LeftHip, Landmark::RightHip),
    (Landmark::LeftHip, Landmark::LeftKnee),
    (Landmark::LeftKnee, Landmark::LeftAnkle),
    (Landmark::RightHip, Landmark::RightKnee),
    (Landmark::RightKnee, Landmark::RightAnkle),
];

/// One landmark: normalized image position (origin top-left, `y` down)
/// and detector confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub y: f32,
    pub x: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(y: f32, x: f32, confidence: f32) -> Self {
        Self { y, x, confidence }
    }

    /// Position as a `(y, x)` pair.
    pub fn position(&self) -> (f32, f32) {
        (self.y, self.x)
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}

/// A full 17-keypoint skeleton at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    keypoints: [Keypoint; KEYPOINT_COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KEYPOINT_COUNT]) -> Self {
        Self { keypoints }
    }

    /// Build a pose from `[y, x, confidence]` rows. Anything other than
    /// exactly 17 rows is rejected.
    pub fn from_rows(rows: &[[f32; KEYPOINT_DIMS]]) -> Result<Self, PoseError> {
        if rows.len() != KEYPOINT_COUNT {
            return Err(PoseError::InputShape {
                found: vec![rows.len(), KEYPOINT_DIMS],
            });
        }

        let mut keypoints = [Keypoint::default(); KEYPOINT_COUNT];
        for (kp, row) in keypoints.iter_mut().zip(rows) {
            *kp = Keypoint::new(row[0], row[1], row[2]);
        }
        Ok(Self { keypoints })
    }

    /// Build a pose from a row-major tensor. Leading singleton batch axes
    /// are accepted, so `[17, 3]`, `[1, 17, 3]` and `[1, 1, 17, 3]` all work.
    pub fn from_tensor(shape: &[usize], data: &[f32]) -> Result<Self, PoseError> {
        let shape_err = || PoseError::InputShape {
            found: shape.to_vec(),
        };

        let mut dims = shape;
        while dims.len() > 2 && dims[0] == 1 {
            dims = &dims[1..];
        }
        if dims != [KEYPOINT_COUNT, KEYPOINT_DIMS] {
            return Err(shape_err());
        }
        if data.len() != KEYPOINT_COUNT * KEYPOINT_DIMS {
            return Err(shape_err());
        }

        let mut keypoints = [Keypoint::default(); KEYPOINT_COUNT];
        for (kp, row) in keypoints.iter_mut().zip(data.chunks_exact(KEYPOINT_DIMS)) {
            *kp = Keypoint::new(row[0], row[1], row[2]);
        }
        Ok(Self { keypoints })
    }

    pub fn keypoints(&self) -> &[Keypoint; KEYPOINT_COUNT] {
        &self.keypoints
    }

    pub fn keypoints_mut(&mut self) -> &mut [Keypoint; KEYPOINT_COUNT] {
        &mut self.keypoints
    }

    pub fn to_rows(&self) -> [[f32; KEYPOINT_DIMS]; KEYPOINT_COUNT] {
        let mut rows = [[0.0; KEYPOINT_DIMS]; KEYPOINT_COUNT];
        for (row, kp) in rows.iter_mut().zip(&self.keypoints) {
            *row = [kp.y, kp.x, kp.confidence];
        }
        rows
    }

    /// Midpoint of the two hips as `(y, x)`.
    pub fn hip_midpoint(&self) -> (f32, f32) {
        midpoint(self[Landmark::LeftHip], self[Landmark::RightHip])
    }

    /// Midpoint of the two shoulders as `(y, x)`.
    pub fn shoulder_midpoint(&self) -> (f32, f32) {
        midpoint(self[Landmark::LeftShoulder], self[Landmark::RightShoulder])
    }

    /// Vertical hip position, the quantity squat and sit rules track.
    pub fn hip_height(&self) -> f32 {
        self.hip_midpoint().0
    }

    /// Every `(y, x)` pair in landmark order, confidence dropped.
    pub fn flatten_positions(&self) -> [f32; KEYPOINT_COUNT * 2] {
        let mut out = [0.0; KEYPOINT_COUNT * 2];
        for (pair, kp) in out.chunks_exact_mut(2).zip(&self.keypoints) {
            pair[0] = kp.y;
            pair[1] = kp.x;
        }
        out
    }
}

impl Index<Landmark> for Pose {
    type Output = Keypoint;

    fn index(&self, landmark: Landmark) -> &Keypoint {
        &self.keypoints[landmark as usize]
    }
}

fn midpoint(a: Keypoint, b: Keypoint) -> (f32, f32) {
    ((a.y + b.y) / 2.0, (a.x + b.x) / 2.0)
}
