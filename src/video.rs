// THEORY:
// The camera runs on its own clock. The tick loop must never wait for it: at the
// top of every tick the pipeline takes whatever frame arrived last and moves on.
// A `tokio::sync::watch` channel is exactly that contract. The producer
// overwrites a single slot, readers see the newest value, and nobody queues.
//
// A second watch carries the "video ready" flag. Sources raise it once their
// output has settled (auto-exposure, white balance, ...), which together with the
// pipeline's startup tick count keeps the first noisy frames from lighting up the
// whole grid.
//
// `SyntheticSource` stands in for a camera: a bright square sweeping over a flat
// background. It drives the demo binary and the tests.

use crate::core_modules::pixel::Pixel;
use crate::core_modules::pixel_buffer::PixelBuffer;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub type SharedFrame = Arc<PixelBuffer>;

/// Anything that yields camera frames. `None` ends the stream.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> Option<PixelBuffer>;
}

/// Producer half: owned by the capture task.
pub struct VideoPublisher {
    frames: watch::Sender<Option<SharedFrame>>,
    ready: watch::Sender<bool>,
}

/// Consumer half: read by the tick loop.
#[derive(Clone)]
pub struct VideoFeed {
    frames: watch::Receiver<Option<SharedFrame>>,
    ready: watch::Receiver<bool>,
}

pub fn channel() -> (VideoPublisher, VideoFeed) {
    let (frames_tx, frames_rx) = watch::channel(None);
    let (ready_tx, ready_rx) = watch::channel(false);
    (
        VideoPublisher {
            frames: frames_tx,
            ready: ready_tx,
        },
        VideoFeed {
            frames: frames_rx,
            ready: ready_rx,
        },
    )
}

impl VideoPublisher {
    /// Replaces the latest frame. Returns `false` once every feed is gone.
    pub fn publish(&self, frame: PixelBuffer) -> bool {
        self.frames.send(Some(Arc::new(frame))).is_ok()
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }
}

impl VideoFeed {
    /// Most recent frame, if any has arrived yet. Never blocks.
    pub fn latest(&self) -> Option<SharedFrame> {
        self.frames.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

/// Runs `source` on its own task, publishing one frame per `period`. The ready
/// flag goes up after `warmup_frames` frames.
pub fn spawn_source<S: FrameSource>(
    mut source: S,
    publisher: VideoPublisher,
    period: Duration,
    warmup_frames: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut published = 0u32;
        loop {
            interval.tick().await;
            let Some(frame) = source.next_frame() else {
                info!("[VIDEO] source exhausted after {} frames", published);
                break;
            };
            if !publisher.publish(frame) {
                debug!("[VIDEO] no readers left, stopping capture");
                break;
            }
            published += 1;
            if published == warmup_frames.max(1) {
                info!("[VIDEO] ready after {} frames", published);
                publisher.mark_ready();
            }
        }
    })
}

/// A flat background with a bright square sweeping left to right, row band by
/// row band.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    target: u32,
    step: u32,
    frame_index: u64,
    limit: Option<u64>,
}

impl SyntheticSource {
    const BACKGROUND: Pixel = Pixel::new(30, 30, 40, 255);
    const TARGET: Pixel = Pixel::new(240, 220, 200, 255);

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            target: (width.min(height) / 8).max(1),
            step: (width / 32).max(1),
            frame_index: 0,
            limit: None,
        }
    }

    /// Stops after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Top-left corner of the square in frame `index`.
    pub fn target_position(&self, index: u64) -> (u32, u32) {
        let travel = self.width.saturating_sub(self.target).max(1) as u64;
        let bands = (self.height / self.target).max(1) as u64;
        let offset = index * self.step as u64;
        let x = (offset % travel) as u32;
        let band = (offset / travel) % bands;
        (x, band as u32 * self.target)
    }

    pub fn render(&self, index: u64) -> PixelBuffer {
        let mut frame = PixelBuffer::filled(self.width, self.height, Self::BACKGROUND);
        let (tx, ty) = self.target_position(index);
        for y in ty..(ty + self.target).min(self.height) {
            for x in tx..(tx + self.target).min(self.width) {
                frame.set(x, y, Self::TARGET);
            }
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Option<PixelBuffer> {
        if self.limit.is_some_and(|limit| self.frame_index >= limit) {
            return None;
        }
        let frame = self.render(self.frame_index);
        self.frame_index += 1;
        Some(frame)
    }
}
