// THEORY:
// The motion grid never talks to a concrete window, canvas or GPU. It describes
// what it wants drawn with a handful of plain primitives and hands them to a
// `Display`. Anything that can draw an ellipse, place a line of text and blit an
// image can host the grid.
//
// Two displays ship with the crate:
// 1.  `Canvas`: a software rasterizer over an RGBA image. Ellipses are filled
//     and stroked with alpha blending; images are blitted nearest-neighbour,
//     optionally mirrored. Text is not rasterized (there is no font stack); the
//     canvas keeps the labels it was asked to draw so callers can still inspect
//     them. Good enough for headless runs and PNG snapshots.
// 2.  `Recorder`: keeps every command it receives. Used by tests and by anyone
//     who wants to forward the draw list to a different backend later.

use crate::core_modules::pixel::Pixel;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::Result;
use std::path::Path;

/// An RGBA color with floating-point channels in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 255.0)
    }

    /// Linear interpolation between two colors, `amount` clamped to 0..=1.
    pub fn lerp(self, other: Rgba, amount: f32) -> Rgba {
        let t = amount.clamp(0.0, 1.0);
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// Circle centered on `(x, y)`. The stroke straddles the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub x: f32,
    pub y: f32,
    pub diameter: f32,
    pub fill: Option<Rgba>,
    pub stroke: Rgba,
    pub stroke_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub align: TextAlign,
    pub color: Rgba,
}

/// Destination rectangle for a blit, in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Ellipse(Ellipse),
    Text(Text),
}

/// A surface the grid can draw on.
pub trait Display {
    fn ellipse(&mut self, ellipse: &Ellipse);

    fn text(&mut self, text: &Text);

    /// Draws `image` scaled into `target`. `mirrored` flips it horizontally.
    fn blit(&mut self, image: &PixelBuffer, target: Rect, mirrored: bool);

    fn draw(&mut self, command: &DrawCommand) {
        match command {
            DrawCommand::Ellipse(e) => self.ellipse(e),
            DrawCommand::Text(t) => self.text(t),
        }
    }
}

/// Keeps every command it is handed, in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub commands: Vec<DrawCommand>,
    /// Target rectangle and mirror flag of each blit.
    pub blits: Vec<(Rect, bool)>,
}

impl Recorder {
    pub fn ellipses(&self) -> impl Iterator<Item = &Ellipse> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Ellipse(e) => Some(e),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &Text> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.blits.clear();
    }
}

impl Display for Recorder {
    fn ellipse(&mut self, ellipse: &Ellipse) {
        self.commands.push(DrawCommand::Ellipse(ellipse.clone()));
    }

    fn text(&mut self, text: &Text) {
        self.commands.push(DrawCommand::Text(text.clone()));
    }

    fn blit(&mut self, _image: &PixelBuffer, target: Rect, mirrored: bool) {
        self.blits.push((target, mirrored));
    }
}

/// Software raster display backed by an RGBA buffer.
pub struct Canvas {
    frame: PixelBuffer,
    background: Pixel,
    labels: Vec<Text>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: PixelBuffer::filled(width, height, Pixel::BLACK),
            background: Pixel::BLACK,
            labels: Vec::new(),
        }
    }

    /// Paints the whole canvas with the background color and forgets labels.
    pub fn clear(&mut self) {
        let (width, height) = self.frame.dimensions();
        self.frame = PixelBuffer::filled(width, height, self.background);
        self.labels.clear();
    }

    pub fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    /// Text drawn since the last `clear`.
    pub fn labels(&self) -> &[Text] {
        &self.labels
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.frame.save_png(path)
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let Some(under) = self.frame.get(x, y) else {
            return;
        };
        let alpha = (color.a / 255.0).clamp(0.0, 1.0);
        let mix = |top: f32, bottom: u8| -> u8 {
            (top * alpha + bottom as f32 * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8
        };
        self.frame.set(
            x,
            y,
            Pixel::new(
                mix(color.r, under.red),
                mix(color.g, under.green),
                mix(color.b, under.blue),
                255,
            ),
        );
    }
}

impl Display for Canvas {
    fn ellipse(&mut self, ellipse: &Ellipse) {
        let radius = ellipse.diameter / 2.0;
        let half_stroke = ellipse.stroke_weight.max(0.0) / 2.0;
        let outer = radius + half_stroke;
        if outer <= 0.0 {
            return;
        }
        let inner = (radius - half_stroke).max(0.0);

        let x0 = (ellipse.x - outer).floor() as i64;
        let x1 = (ellipse.x + outer).ceil() as i64;
        let y0 = (ellipse.y - outer).floor() as i64;
        let y1 = (ellipse.y + outer).ceil() as i64;

        for py in y0..=y1 {
            for px in x0..=x1 {
                // Sample at the pixel center.
                let dx = px as f32 + 0.5 - ellipse.x;
                let dy = py as f32 + 0.5 - ellipse.y;
                let d = (dx * dx + dy * dy).sqrt();
                if half_stroke > 0.0 && d >= inner && d <= outer {
                    self.blend(px, py, ellipse.stroke);
                } else if d <= radius {
                    if let Some(fill) = ellipse.fill {
                        self.blend(px, py, fill);
                    }
                }
            }
        }
    }

    fn text(&mut self, text: &Text) {
        log::trace!("[CANVAS] label '{}' at ({}, {})", text.content, text.x, text.y);
        self.labels.push(text.clone());
    }

    fn blit(&mut self, image: &PixelBuffer, target: Rect, mirrored: bool) {
        if target.width <= 0.0 || target.height <= 0.0 || image.pixel_count() == 0 {
            return;
        }
        let x0 = target.x.floor() as i64;
        let y0 = target.y.floor() as i64;
        let w = target.width.round() as i64;
        let h = target.height.round() as i64;
        let sx = image.width() as f32 / target.width;
        let sy = image.height() as f32 / target.height;

        for ty in 0..h {
            for tx in 0..w {
                let column = if mirrored { w - 1 - tx } else { tx };
                let src_x = ((column as f32 + 0.5) * sx) as u32;
                let src_y = ((ty as f32 + 0.5) * sy) as u32;
                if let Some(p) = image.get(src_x.min(image.width() - 1), src_y.min(image.height() - 1)) {
                    self.blend(
                        x0 + tx,
                        y0 + ty,
                        Rgba::new(p.red as f32, p.green as f32, p.blue as f32, p.alpha as f32),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_both_ends() {
        let a = Rgba::new(100.0, 0.0, 0.0, 200.0);
        let b = Rgba::new(0.0, 0.0, 100.0, 200.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Rgba::new(50.0, 0.0, 50.0, 200.0));
        assert_eq!(a.lerp(b, 4.0), b);
    }

    #[test]
    fn filled_ellipse_paints_its_center_only() {
        let mut canvas = Canvas::new(40, 40);
        canvas.ellipse(&Ellipse {
            x: 20.0,
            y: 20.0,
            diameter: 10.0,
            fill: Some(Rgba::opaque(0.0, 0.0, 255.0)),
            stroke: Rgba::opaque(255.0, 255.0, 0.0),
            stroke_weight: 0.0,
        });
        assert_eq!(canvas.frame().get(20, 20), Some(Pixel::new(0, 0, 255, 255)));
        assert_eq!(canvas.frame().get(2, 2), Some(Pixel::BLACK));
    }

    #[test]
    fn stroke_only_ellipse_leaves_a_hole() {
        let mut canvas = Canvas::new(40, 40);
        canvas.ellipse(&Ellipse {
            x: 20.0,
            y: 20.0,
            diameter: 30.0,
            fill: None,
            stroke: Rgba::opaque(255.0, 255.0, 255.0),
            stroke_weight: 2.0,
        });
        assert_eq!(canvas.frame().get(20, 20), Some(Pixel::BLACK));
        // Right edge of the ring: center 20 + radius 15, sampled at the pixel center.
        assert_eq!(canvas.frame().get(34, 19), Some(Pixel::WHITE));
    }

    #[test]
    fn transparent_fill_keeps_the_background() {
        let mut canvas = Canvas::new(10, 10);
        canvas.ellipse(&Ellipse {
            x: 5.0,
            y: 5.0,
            diameter: 8.0,
            fill: Some(Rgba::new(255.0, 255.0, 255.0, 0.0)),
            stroke: Rgba::new(0.0, 0.0, 0.0, 0.0),
            stroke_weight: 0.0,
        });
        assert!(canvas.frame().pixels().all(|p| p == Pixel::BLACK));
    }

    #[test]
    fn mirrored_blit_flips_columns() {
        let mut image = PixelBuffer::filled(2, 1, Pixel::BLACK);
        image.set(0, 0, Pixel::WHITE);
        let mut canvas = Canvas::new(2, 1);
        let target = Rect {
            x: 0.0,
            y: 0.0,
            width: 2.0,
            height: 1.0,
        };
        canvas.blit(&image, target, true);
        assert_eq!(canvas.frame().get(1, 0), Some(Pixel::WHITE));
        assert_eq!(canvas.frame().get(0, 0), Some(Pixel::BLACK));
    }

    #[test]
    fn recorder_keeps_order() {
        let mut recorder = Recorder::default();
        let text = Text {
            content: "C".into(),
            x: 1.0,
            y: 2.0,
            size: 18.0,
            align: TextAlign::Center,
            color: Rgba::opaque(0.0, 255.0, 0.0),
        };
        recorder.draw(&DrawCommand::Text(text.clone()));
        assert_eq!(recorder.texts().next(), Some(&text));
        assert_eq!(recorder.ellipses().count(), 0);
    }
}
