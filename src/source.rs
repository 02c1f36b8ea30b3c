//! Recorded keypoint sequences.
//!
//! Video decoding and pose inference happen outside this crate; what
//! arrives here is the estimator's per-frame keypoint output. The JSON
//! layout is either a bare array of frames or
//!
//! ```json
//! { "frame_rate": 30.0, "frames": [ [[y, x, c], ...17 rows], ... ] }
//! ```
//!
//! Each frame may keep the model's batch axes (`[1, 1, 17, 3]`).

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::DEFAULT_FRAME_RATE;
use crate::pose::{Pose, KEYPOINT_COUNT, KEYPOINT_DIMS};

/// Frames of one recording plus the rate used to timestamp events.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSequence {
    pub frame_rate: f32,
    pub frames: Vec<Pose>,
}

impl RecordedSequence {
    pub fn new(frame_rate: f32, frames: Vec<Pose>) -> Self {
        Self { frame_rate, frames }
    }

    /// Seconds spanned by the recording.
    pub fn duration_secs(&self) -> f32 {
        self.frames.len() as f32 / self.frame_rate
    }
}

/// Anything that turns a path into an ordered sequence of poses.
pub trait SequenceSource {
    fn load(&self, path: &Path) -> Result<RecordedSequence>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSequenceSource;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecording {
    Framed {
        #[serde(default)]
        frame_rate: Option<f32>,
        frames: Vec<Value>,
    },
    Bare(Vec<Value>),
}

#[derive(Serialize)]
struct SavedRecording {
    frame_rate: f32,
    frames: Vec<[[f32; KEYPOINT_DIMS]; KEYPOINT_COUNT]>,
}

impl JsonSequenceSource {
    pub fn parse(&self, content: &str) -> Result<RecordedSequence> {
        let raw: RawRecording = serde_json::from_str(content)?;
        let (frame_rate, values) = match raw {
            RawRecording::Framed { frame_rate, frames } => (frame_rate, frames),
            RawRecording::Bare(frames) => (None, frames),
        };

        let frame_rate = match frame_rate {
            Some(rate) if rate > 0.0 => rate,
            Some(rate) => {
                warn!(rate, "non-positive frame rate, falling back to {}", DEFAULT_FRAME_RATE);
                DEFAULT_FRAME_RATE
            }
            None => DEFAULT_FRAME_RATE,
        };

        let frames = values
            .iter()
            .enumerate()
            .map(|(i, v)| pose_from_value(v).with_context(|| format!("frame {}", i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordedSequence::new(frame_rate, frames))
    }

    pub fn save(&self, path: &Path, recording: &RecordedSequence) -> Result<()> {
        let saved = SavedRecording {
            frame_rate: recording.frame_rate,
            frames: recording.frames.iter().map(Pose::to_rows).collect(),
        };
        fs::write(path, serde_json::to_string(&saved)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl SequenceSource for JsonSequenceSource {
    fn load(&self, path: &Path) -> Result<RecordedSequence> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keypoints {}", path.display()))?;
        let recording = self
            .parse(&content)
            .with_context(|| format!("parsing keypoints {}", path.display()))?;
        info!(
            path = %path.display(),
            frames = recording.frames.len(),
            frame_rate = recording.frame_rate,
            "loaded recording"
        );
        Ok(recording)
    }
}

/// Flatten a nested JSON array into a shape and row-major data, then let
/// `Pose::from_tensor` decide whether the shape is acceptable.
fn pose_from_value(value: &Value) -> Result<Pose> {
    let mut shape = Vec::new();
    let mut cursor = value;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }

    let mut data = Vec::new();
    collect_numbers(value, shape.len(), &mut data)?;
    Ok(Pose::from_tensor(&shape, &data)?)
}

fn collect_numbers(value: &Value, depth: usize, out: &mut Vec<f32>) -> Result<()> {
    match (value, depth) {
        (Value::Number(n), 0) => match n.as_f64() {
            Some(v) => out.push(v as f32),
            None => bail!("keypoint value {} is not representable", n),
        },
        (Value::Array(items), d) if d > 0 => {
            for item in items {
                collect_numbers(item, d - 1, out)?;
            }
        }
        _ => bail!("ragged keypoint array"),
    }
    Ok(())
}
