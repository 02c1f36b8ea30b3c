//! Elastic sequence matching.
//!
//! Sequences are normalized, each pose is flattened to its 34 `(y, x)`
//! coordinates, and the dynamic time warping distance is computed over a
//! rolling two-row cost grid. A path may repeat frames of either series but
//! never skips or goes backward, so the distance ignores differences in
//! execution speed.
//!
//! Distance is O(n·m). The sliding window search is O((L−T+1)·T²), which is
//! fine offline and the reason the live gesture path never touches DTW.

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MatcherConfig;
use crate::error::PoseError;
use crate::normalize::normalize;
use crate::pose::{Pose, KEYPOINT_COUNT};

/// One flattened, normalized frame.
type Frame = [f32; KEYPOINT_COUNT * 2];

/// How per-frame distances accumulate along the warping path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCost {
    /// Sum of Euclidean distances between aligned frames.
    #[default]
    Euclidean,
    /// Square root of the summed squared distances.
    RootSumSquares,
}

/// Best alignment of a template inside a longer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowMatch {
    pub offset: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SequenceMatcher {
    config: MatcherConfig,
}

impl SequenceMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// DTW distance between two pose sequences.
    pub fn distance(&self, a: &[Pose], b: &[Pose]) -> Result<f32, PoseError> {
        let a = flatten(&normalize(a)?);
        let b = flatten(&normalize(b)?);
        Ok(self.dtw(&a, &b))
    }

    /// Slide a template-length window over `sequence` at every offset and
    /// return the one closest to `template`. Ties keep the earliest offset.
    pub fn best_window_match(
        &self,
        sequence: &[Pose],
        template: &[Pose],
    ) -> Result<WindowMatch, PoseError> {
        let (frames, template) = self.prepare_window_search(sequence, template)?;
        let offsets = frames.len() - template.len() + 1;

        let best = self
            .scan(&frames, &template, 0..offsets)
            .ok_or(PoseError::InvalidWindow {
                sequence_len: sequence.len(),
                template_len: template.len(),
            })?;

        debug!(
            offsets,
            offset = best.offset,
            distance = best.distance,
            "window search finished"
        );
        Ok(best)
    }

    /// [`best_window_match`](Self::best_window_match) with offsets split across
    /// scoped worker threads. Returns the same result as the sequential search.
    pub fn best_window_match_parallel(
        &self,
        sequence: &[Pose],
        template: &[Pose],
    ) -> Result<WindowMatch, PoseError> {
        let (frames, template) = self.prepare_window_search(sequence, template)?;
        let offsets = frames.len() - template.len() + 1;

        let workers = match self.config.workers {
            0 => thread::available_parallelism().map_or(1, NonZeroUsize::get),
            n => n,
        }
        .min(offsets);
        let chunk = offsets.div_ceil(workers);

        let partials: Vec<Option<WindowMatch>> = thread::scope(|s| {
            let handles: Vec<_> = (0..offsets)
                .step_by(chunk)
                .map(|start| {
                    let end = (start + chunk).min(offsets);
                    let (frames, template) = (&frames, &template);
                    s.spawn(move || self.scan(frames, template, start..end))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let best = partials
            .into_iter()
            .flatten()
            .reduce(pick_better)
            .ok_or(PoseError::InvalidWindow {
                sequence_len: sequence.len(),
                template_len: template.len(),
            })?;

        debug!(
            offsets,
            workers,
            offset = best.offset,
            distance = best.distance,
            "parallel window search finished"
        );
        Ok(best)
    }

    fn prepare_window_search(
        &self,
        sequence: &[Pose],
        template: &[Pose],
    ) -> Result<(Vec<Frame>, Vec<Frame>), PoseError> {
        if template.is_empty() || sequence.len() < template.len() {
            return Err(PoseError::InvalidWindow {
                sequence_len: sequence.len(),
                template_len: template.len(),
            });
        }
        // Normalization is per pose, so normalizing once up front equals
        // normalizing every window.
        Ok((flatten(&normalize(sequence)?), flatten(&normalize(template)?)))
    }

    fn scan(
        &self,
        frames: &[Frame],
        template: &[Frame],
        offsets: std::ops::Range<usize>,
    ) -> Option<WindowMatch> {
        let len = template.len();
        offsets
            .map(|offset| WindowMatch {
                offset,
                distance: self.dtw(&frames[offset..offset + len], template),
            })
            .reduce(pick_better)
    }

    fn dtw(&self, a: &[Frame], b: &[Frame]) -> f32 {
        let (n, m) = (a.len(), b.len());
        // A band narrower than the length difference would leave no path.
        let band = self.config.band.map(|w| w.max(n.abs_diff(m)));

        let mut prev = vec![f64::INFINITY; m + 1];
        let mut curr = vec![f64::INFINITY; m + 1];
        prev[0] = 0.0;

        for i in 1..=n {
            curr.fill(f64::INFINITY);
            let (lo, hi) = match band {
                Some(w) => (i.saturating_sub(w).max(1), (i + w).min(m)),
                None => (1, m),
            };
            for j in lo..=hi {
                let cost = self.step_cost(&a[i - 1], &b[j - 1]);
                let best = prev[j - 1].min(prev[j]).min(curr[j - 1]);
                curr[j] = cost + best;
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        let total = prev[m];
        match self.config.step_cost {
            StepCost::Euclidean => total as f32,
            StepCost::RootSumSquares => total.sqrt() as f32,
        }
    }

    fn step_cost(&self, a: &Frame, b: &Frame) -> f64 {
        let squared: f64 = a
            .iter()
            .zip(b)
            .map(|(p, q)| {
                let d = f64::from(p - q);
                d * d
            })
            .sum();
        match self.config.step_cost {
            StepCost::Euclidean => squared.sqrt(),
            StepCost::RootSumSquares => squared,
        }
    }
}

/// DTW distance with the default matcher settings.
pub fn distance(a: &[Pose], b: &[Pose]) -> Result<f32, PoseError> {
    SequenceMatcher::default().distance(a, b)
}

/// Best window search with the default matcher settings.
pub fn best_window_match(sequence: &[Pose], template: &[Pose]) -> Result<WindowMatch, PoseError> {
    SequenceMatcher::default().best_window_match(sequence, template)
}

fn flatten(sequence: &[Pose]) -> Vec<Frame> {
    sequence.iter().map(Pose::flatten_positions).collect()
}

fn pick_better(a: WindowMatch, b: WindowMatch) -> WindowMatch {
    if b.distance < a.distance || (b.distance == a.distance && b.offset < a.offset) {
        b
    } else {
        a
    }
}
