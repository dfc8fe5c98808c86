// THEORY:
// The frame differencer is the motion detector. It is plain background
// subtraction: the previous frame is the "background" and every pixel of the
// current frame that moved far enough away from it in RGB space is foreground.
//
// Key properties:
// 1.  **Stateless**: `diff` is a pure function of two frames and a threshold.
//     Remembering the previous frame is the pipeline's job, as is deciding what
//     to do before a previous frame exists (nothing moves on the first tick).
// 2.  **Simple threshold**: distance > threshold marks foreground. Raising the
//     threshold can only shrink the foreground set.
// 3.  **Ephemeral output**: a `MotionMask` lives for one tick. It is handed to the
//     grid, optionally painted for display, and dropped.

use crate::core_modules::pixel::{CHANNELS, Pixel};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::{MotionGridError, Result};

/// Lowest and highest accepted threshold values.
pub const THRESHOLD_MIN: u8 = 0;
pub const THRESHOLD_MAX: u8 = 255;

/// Per-pixel foreground flags for one analysis frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionMask {
    width: u32,
    height: u32,
    foreground: Vec<bool>,
}

impl MotionMask {
    /// A mask with no motion anywhere.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            foreground: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of mask entries; equals `width * height`.
    pub fn len(&self) -> usize {
        self.foreground.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty()
    }

    /// Foreground flag at a linear row-major offset. Offsets past the end read
    /// as background.
    pub fn at_offset(&self, offset: usize) -> bool {
        self.foreground.get(offset).copied().unwrap_or(false)
    }

    /// Foreground flag at `(x, y)`. Coordinates outside the mask read as
    /// background.
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.at_offset(y as usize * self.width as usize + x as usize)
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = y as usize * self.width as usize + x as usize;
        self.foreground[offset] = value;
    }

    pub fn foreground_count(&self) -> usize {
        self.foreground.iter().filter(|f| **f).count()
    }

    /// Paints the mask as the classic black-on-white image: moving pixels black,
    /// still pixels white, fully opaque.
    pub fn to_pixel_buffer(&self) -> PixelBuffer {
        let mut data = Vec::with_capacity(self.foreground.len() * CHANNELS);
        for &moving in &self.foreground {
            let pixel = if moving { Pixel::BLACK } else { Pixel::WHITE };
            data.extend_from_slice(&pixel.to_bytes());
        }
        PixelBuffer::from(
            image::RgbaImage::from_raw(self.width, self.height, data)
                .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height)),
        )
    }

    /// Reads a black/white mask image back. A pixel is foreground when the
    /// selected channel (0 = red .. 3 = alpha) is zero.
    pub fn from_rgba(buffer: &PixelBuffer, channel: usize) -> Self {
        let channel = channel.min(CHANNELS - 1);
        let foreground = buffer
            .as_bytes()
            .chunks_exact(CHANNELS)
            .map(|rgba| rgba[channel] == 0)
            .collect();
        Self {
            width: buffer.width(),
            height: buffer.height(),
            foreground,
        }
    }
}

/// Marks every pixel whose RGB distance between `current` and `previous`
/// exceeds `threshold` as foreground.
pub fn diff(current: &PixelBuffer, previous: &PixelBuffer, threshold: u8) -> Result<MotionMask> {
    if current.dimensions() != previous.dimensions() {
        return Err(MotionGridError::DimensionMismatch {
            current: current.dimensions(),
            previous: previous.dimensions(),
        });
    }

    // Compare squared distances so no root is taken per pixel.
    let limit = threshold as u32 * threshold as u32;
    let foreground = current
        .pixels()
        .zip(previous.pixels())
        .map(|(now, before)| now.squared_distance(&before) > limit)
        .collect();

    Ok(MotionMask {
        width: current.width(),
        height: current.height(),
        foreground,
    })
}
