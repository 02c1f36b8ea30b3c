//! Joint angle calculation using the dot product.
//!
//! Points are `(y, x)` pairs in normalized image space. Angles are invariant
//! under the axis swap, so callers never need to reorder to `(x, y)`.

use crate::pose::Keypoint;

/// Added to the magnitude product so coincident points cannot divide by zero.
const EPSILON: f32 = 1e-6;

/// Angle at vertex `b` between rays `b -> a` and `b -> c`, in degrees.
///
/// cos(θ) = (BA · BC) / (|BA| × |BC| + ε), clipped to [-1, 1].
///
/// - 180° = straight joint
/// - 90° = right angle
/// - coincident points give 90° (zero dot product), never NaN
pub fn angle(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let ba = sub(a, b);
    let bc = sub(c, b);

    let cos_angle = (dot(ba, bc) / (norm(ba) * norm(bc) + EPSILON)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// [`angle`] over three keypoints, ignoring their confidences.
pub fn joint_angle(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> f32 {
    angle(a.position(), b.position(), c.position())
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    norm(sub(a, b))
}

fn sub(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    (a.0 - b.0, a.1 - b.1)
}

fn dot(a: (f32, f32), b: (f32, f32)) -> f32 {
    a.0 * b.0 + a.1 * b.1
}

fn norm(v: (f32, f32)) -> f32 {
    (v.0 * v.0 + v.1 * v.1).sqrt()
}
