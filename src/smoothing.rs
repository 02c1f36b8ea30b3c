//! Rolling window of raw poses.
//!
//! The running coordinate-wise mean is the smoothed pose fed to the gesture
//! rules. Confidence is never averaged: the smoothed pose carries the
//! confidences of the most recent raw pose.

use std::collections::VecDeque;

use crate::pose::Pose;

/// Default number of frames in the smoothing window.
pub const DEFAULT_CAPACITY: usize = 5;

pub struct SmoothingBuffer {
    capacity: usize,
    frames: VecDeque<Pose>,
}

impl SmoothingBuffer {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a raw pose, evicting the oldest at capacity, and return the
    /// smoothed pose.
    pub fn push(&mut self, raw: Pose) -> Pose {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(raw);

        let n = self.frames.len() as f32;
        let mut smoothed = raw;
        for (i, kp) in smoothed.keypoints_mut().iter_mut().enumerate() {
            let (sum_y, sum_x) = self.frames.iter().fold((0.0, 0.0), |(sy, sx), frame| {
                let p = frame.keypoints()[i];
                (sy + p.y, sx + p.x)
            });
            kp.y = sum_y / n;
            kp.x = sum_x / n;
        }
        smoothed
    }

    /// True once `capacity` poses have been pushed.
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Population variance of the raw hip height across the window.
    /// `None` until the window is full.
    pub fn hip_height_variance(&self) -> Option<f32> {
        if !self.is_full() {
            return None;
        }

        let n = self.frames.len() as f32;
        let mean = self.frames.iter().map(Pose::hip_height).sum::<f32>() / n;
        let variance = self
            .frames
            .iter()
            .map(|p| (p.hip_height() - mean).powi(2))
            .sum::<f32>()
            / n;
        Some(variance)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
