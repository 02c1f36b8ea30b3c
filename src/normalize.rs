//! Translation and scale removal.
//!
//! Each pose is centered on its hip midpoint and divided by its torso length
//! (shoulder midpoint to hip midpoint), so the same movement compares equal
//! regardless of where the subject stands or how far they are from the camera.

use crate::error::PoseError;
use crate::geometry;
use crate::pose::Pose;

/// Torso length used when shoulders and hips coincide.
const DEGENERATE_TORSO: f32 = 1.0;

/// Center and scale a single pose. Confidence is left untouched.
pub fn normalize_pose(pose: &Pose) -> Pose {
    let hip = pose.hip_midpoint();
    let torso = geometry::distance(pose.shoulder_midpoint(), hip);
    let scale = if torso > 0.0 { torso } else { DEGENERATE_TORSO };

    let mut out = *pose;
    for kp in out.keypoints_mut() {
        kp.y = (kp.y - hip.0) / scale;
        kp.x = (kp.x - hip.1) / scale;
    }
    out
}

/// Normalize every pose of a sequence independently.
pub fn normalize(sequence: &[Pose]) -> Result<Vec<Pose>, PoseError> {
    if sequence.is_empty() {
        return Err(PoseError::InvalidSequence);
    }
    Ok(sequence.iter().map(normalize_pose).collect())
}
