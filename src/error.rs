// THEORY:
// One error type for the whole library. Every failure the motion grid can report
// is a variant here, so callers match on a single enum instead of juggling
// `&'static str` messages. The binary wraps it in `anyhow` at the top level.
//
// The conditions that matter at runtime:
// - `DimensionMismatch`: the two frames handed to the differencer disagree in
//   size. The pipeline treats the tick as "no motion" and moves on.
// - `MissingAsset`: the audio collaborator has no sound for a pitch. Playback is
//   skipped; the visual pulse still happens.
// - `InvalidConfig`: a configuration that cannot build a grid (zero cell size,
//   empty region, ...). Raised once at startup.
// - `BufferSize`: raw bytes that do not describe a whole RGBA frame.
// The remaining variants wrap I/O and codec failures from the ambient stack.

use std::fmt;

/// Width and height of a frame, used in mismatch reports.
pub type Dimensions = (u32, u32);

#[derive(Debug)]
pub enum MotionGridError {
    DimensionMismatch {
        current: Dimensions,
        previous: Dimensions,
    },
    BufferSize {
        expected: usize,
        actual: usize,
    },
    MissingAsset(String),
    InvalidConfig(String),
    Image(image::ImageError),
    Io(std::io::Error),
    Config(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MotionGridError>;

impl fmt::Display for MotionGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionGridError::DimensionMismatch { current, previous } => write!(
                f,
                "dimension mismatch: current frame is {}x{}, previous frame is {}x{}",
                current.0, current.1, previous.0, previous.1
            ),
            MotionGridError::BufferSize { expected, actual } => write!(
                f,
                "pixel buffer holds {actual} bytes, expected {expected}"
            ),
            MotionGridError::MissingAsset(key) => write!(f, "no sound asset loaded for '{key}'"),
            MotionGridError::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            MotionGridError::Image(e) => write!(f, "image error: {e}"),
            MotionGridError::Io(e) => write!(f, "i/o error: {e}"),
            MotionGridError::Config(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for MotionGridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MotionGridError::Image(e) => Some(e),
            MotionGridError::Io(e) => Some(e),
            MotionGridError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for MotionGridError {
    fn from(e: image::ImageError) -> Self {
        MotionGridError::Image(e)
    }
}

impl From<std::io::Error> for MotionGridError {
    fn from(e: std::io::Error) -> Self {
        MotionGridError::Io(e)
    }
}

impl From<serde_json::Error> for MotionGridError {
    fn from(e: serde_json::Error) -> Self {
        MotionGridError::Config(e)
    }
}
