// THEORY:
// A `PixelBuffer` is one whole video frame: width, height and a flat, row-major
// RGBA byte array (4 bytes per pixel). It is owned by whoever produced it and is
// read-only to everybody downstream.
//
// This module also owns the two pieces of image plumbing around the frame:
// 1.  **Preprocessing**: the caller-side stage that shrinks a camera frame and
//     blurs it before differencing. Shrinking cuts the per-pixel cost, the blur
//     suppresses sensor noise that would otherwise read as motion.
// 2.  **Snapshots**: writing a buffer out as a PNG, used by the raster display and
//     for inspecting masks by eye.
// Both lean on the `image` crate; a `PixelBuffer` converts to and from
// `image::RgbaImage` by handing over its byte vector.

use crate::core_modules::pixel::{Byte, CHANNELS, Pixel};
use crate::error::{MotionGridError, Result};
use image::ImageEncoder;
use image::imageops::{self, FilterType};
use std::path::Path;

/// An owned RGBA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<Byte>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes. The length must be exactly `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<Byte>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(MotionGridError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&pixel.to_bytes());
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[Byte] {
        &self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns the pixel at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let bytes = &self.data[index..index + CHANNELS];
        Some(Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    /// Writes the pixel at `(x, y)`. Coordinates outside the frame are ignored.
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[index..index + CHANNELS].copy_from_slice(&pixel.to_bytes());
    }

    /// Iterates pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|rgba| Pixel::new(rgba[0], rgba[1], rgba[2], rgba[3]))
    }

    pub fn into_image(self) -> image::RgbaImage {
        // The length was validated on construction, so `from_raw` cannot fail here.
        let (width, height) = (self.width, self.height);
        image::RgbaImage::from_raw(width, height, self.data)
            .unwrap_or_else(|| image::RgbaImage::new(width, height))
    }

    /// Borrows the bytes as an `image` buffer without copying them.
    fn view(&self) -> Option<image::ImageBuffer<image::Rgba<Byte>, &[Byte]>> {
        image::ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
    }

    /// Encodes the frame as a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }
}

impl From<image::RgbaImage> for PixelBuffer {
    fn from(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// Settings for the caller-owned stage that runs before differencing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocess {
    /// Integer divisor applied to both frame dimensions.
    pub downsample: u32,
    /// Gaussian blur sigma; `0.0` disables the blur.
    pub blur_sigma: f32,
}

impl Default for Preprocess {
    fn default() -> Self {
        Self {
            downsample: 4,
            blur_sigma: 3.0,
        }
    }
}

impl Preprocess {
    /// Dimensions of the analysis image for a given camera frame size.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let factor = self.downsample.max(1);
        ((width / factor).max(1), (height / factor).max(1))
    }

    /// Shrinks then blurs a camera frame into the analysis image. The frame is
    /// read in place; only the output is allocated.
    pub fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
        let (width, height) = self.output_dimensions(frame.width, frame.height);
        let Some(view) = frame.view() else {
            return frame.clone();
        };

        let resized = ((width, height) != frame.dimensions())
            .then(|| imageops::resize(&view, width, height, FilterType::Triangle));
        let blur = self.blur_sigma > 0.0;

        match resized {
            Some(small) if blur => PixelBuffer::from(imageops::blur(&small, self.blur_sigma)),
            Some(small) => PixelBuffer::from(small),
            None if blur => PixelBuffer::from(imageops::blur(&view, self.blur_sigma)),
            None => frame.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        let err = PixelBuffer::new(2, 2, vec![0u8; 15]).unwrap_err();
        match err {
            MotionGridError::BufferSize { expected, actual } => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 15);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn get_and_set_are_row_major() {
        let mut buffer = PixelBuffer::filled(3, 2, Pixel::BLACK);
        buffer.set(2, 1, Pixel::WHITE);
        assert_eq!(buffer.get(2, 1), Some(Pixel::WHITE));
        assert_eq!(buffer.get(1, 2), None);
        // Last pixel in the flat array.
        assert_eq!(&buffer.as_bytes()[20..24], &[255, 255, 255, 255]);
    }

    #[test]
    fn out_of_range_set_is_ignored() {
        let mut buffer = PixelBuffer::filled(2, 2, Pixel::BLACK);
        buffer.set(5, 5, Pixel::WHITE);
        assert!(buffer.pixels().all(|p| p == Pixel::BLACK));
    }

    #[test]
    fn image_round_trip_keeps_dimensions() {
        let buffer = PixelBuffer::filled(7, 5, Pixel::new(1, 2, 3, 4));
        let back = PixelBuffer::from(buffer.clone().into_image());
        assert_eq!(back, buffer);
    }

    #[test]
    fn preprocess_quarters_the_frame() {
        let frame = PixelBuffer::filled(640, 480, Pixel::new(90, 90, 90, 255));
        let small = Preprocess::default().apply(&frame);
        assert_eq!(small.dimensions(), (160, 120));
        // A flat frame stays flat through resize and blur.
        let center = small.get(80, 60).expect("center pixel");
        assert!(center.red.abs_diff(90) <= 1);
    }

    #[test]
    fn preprocess_without_blur_or_scaling_is_identity() {
        let mut frame = PixelBuffer::filled(4, 4, Pixel::BLACK);
        frame.set(1, 1, Pixel::WHITE);
        let settings = Preprocess {
            downsample: 1,
            blur_sigma: 0.0,
        };
        assert_eq!(settings.apply(&frame), frame);
    }

    #[test]
    fn preprocess_leaves_the_camera_frame_untouched() {
        let mut frame = PixelBuffer::filled(4, 4, Pixel::BLACK);
        for y in 0..4 {
            frame.set(0, y, Pixel::WHITE);
            frame.set(1, y, Pixel::WHITE);
        }
        let before = frame.clone();
        let small = Preprocess {
            downsample: 2,
            blur_sigma: 0.0,
        }
        .apply(&frame);

        assert_eq!(frame, before);
        assert_eq!(small.dimensions(), (2, 2));
        let left = small.get(0, 0).expect("left pixel").red;
        let right = small.get(1, 0).expect("right pixel").red;
        assert!(left > 128 && right < 128, "left {left}, right {right}");
    }

    #[test]
    fn save_png_writes_a_file() {
        let path = std::env::temp_dir().join("motion_grid_pixel_buffer_test.png");
        let buffer = PixelBuffer::filled(8, 8, Pixel::WHITE);
        buffer.save_png(&path).expect("Error Saving File.");
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }
}
