use std::fmt;

/// Contract violations raised by the pose core.
///
/// Degenerate geometry (zero torso length, coincident joints) is never an
/// error; it is clamped where it is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseError {
    /// Input did not describe exactly 17 `(y, x, confidence)` keypoints.
    InputShape { found: Vec<usize> },
    /// An empty sequence was passed where at least one pose is required.
    InvalidSequence,
    /// The template is empty or longer than the sequence it is slid over.
    InvalidWindow {
        sequence_len: usize,
        template_len: usize,
    },
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseError::InputShape { found } => {
                write!(f, "expected keypoints of shape [17, 3], got {:?}", found)
            }
            PoseError::InvalidSequence => write!(f, "sequence must contain at least one pose"),
            PoseError::InvalidWindow {
                sequence_len,
                template_len,
            } => write!(
                f,
                "template of {} frames cannot slide over a sequence of {} frames",
                template_len, sequence_len
            ),
        }
    }
}

impl std::error::Error for PoseError {}
