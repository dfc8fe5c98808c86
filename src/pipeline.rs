// THEORY:
// The `pipeline` module is the top-level API of the motion grid. `MotionGrid` is
// the application context: it owns the grid, the previous analysis frame, the
// threshold control and the tick counter, and nothing else in the crate keeps
// state between ticks.
//
// One call to `tick` is one full pass, run to completion:
// 1.  **Video**: blit the newest camera frame on the left. It is flipped exactly
//     when the grid mapping is (`mirror`), so a pulse always lands on the
//     movement that caused it.
// 2.  **Analysis** (skipped while warming up): shrink and blur the frame,
//     difference it against the previous one, blit the mask on the right and
//     print the threshold.
// 3.  **Render**: every cell draws, sounds if it just peaked, then decays.
// 4.  **Activation**: the fresh mask activates the cells under moving pixels.
//     They sound on the next tick's render.
//
// Warm-up: the analysis stays off until `startup_ticks` ticks have passed and
// the video source said it is ready. Cameras flicker while they settle, and
// differencing those frames would light up the whole grid at once.

use crate::config::PipelineConfig;
use crate::core_modules::audio::AudioPlayer;
use crate::core_modules::frame_differencer::{self, MotionMask, THRESHOLD_MAX, THRESHOLD_MIN};
use crate::core_modules::grid_manager::Grid;
use crate::core_modules::pitch::PitchName;
use crate::core_modules::pixel_buffer::{PixelBuffer, Preprocess};
use crate::core_modules::render::{Display, Rect, Rgba, Text, TextAlign};
use crate::error::Result;
use log::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::grid_manager::{GridLayout, RenderSummary};

const THRESHOLD_LABEL_POSITION: (f32, f32) = (160.0, 35.0);
const THRESHOLD_LABEL_SIZE: f32 = 12.0;

/// The single user control: a slider over the motion threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdControl {
    value: u8,
}

impl ThresholdControl {
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Moves the slider; values outside 0..=255 stick to the nearest end.
    pub fn set(&mut self, value: i64) {
        self.value = value.clamp(THRESHOLD_MIN as i64, THRESHOLD_MAX as i64) as u8;
    }

    pub fn nudge(&mut self, delta: i64) {
        self.set(self.value as i64 + delta);
    }
}

/// What the analysis stage did during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    /// Still inside the startup gate.
    WarmingUp,
    /// The video source has not delivered anything yet.
    NoFrame,
    /// First frame after start or warm-up; nothing to compare against.
    FirstFrame,
    /// The frame changed size; treated as no motion.
    DimensionMismatch,
    Analyzed {
        foreground_pixels: usize,
        activated_cells: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Zero-based index of the tick this report describes.
    pub tick: u64,
    pub analysis: Analysis,
    /// Pitches triggered by the render phase.
    pub triggers: Vec<PitchName>,
    /// Cells drawn by the render phase.
    pub drawn: usize,
}

pub struct MotionGrid {
    config: PipelineConfig,
    grid: Grid,
    preprocess: Preprocess,
    threshold: ThresholdControl,
    previous: Option<PixelBuffer>,
    last_mask: Option<MotionMask>,
    ticks: u64,
}

impl MotionGrid {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let grid = Grid::new(config.grid_layout())?;
        info!(
            "[PIPELINE] {}x{} grid, threshold {}, warm-up {} ticks",
            grid.column_count(),
            grid.row_count(),
            config.threshold,
            config.startup_ticks
        );
        Ok(Self {
            preprocess: config.preprocess(),
            threshold: ThresholdControl::new(config.threshold),
            grid,
            config,
            previous: None,
            last_mask: None,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn threshold(&self) -> ThresholdControl {
        self.threshold
    }

    pub fn threshold_mut(&mut self) -> &mut ThresholdControl {
        &mut self.threshold
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Mask computed by the most recent analysis, if any.
    pub fn last_mask(&self) -> Option<&MotionMask> {
        self.last_mask.as_ref()
    }

    pub fn is_warming_up(&self, video_ready: bool) -> bool {
        !video_ready || self.ticks < self.config.startup_ticks as u64
    }

    /// Runs one full pass. `frame` is the newest camera frame, if any.
    pub fn tick(
        &mut self,
        frame: Option<&PixelBuffer>,
        video_ready: bool,
        display: &mut dyn Display,
        audio: &mut dyn AudioPlayer,
    ) -> TickReport {
        let tick = self.ticks;

        if let (Some(frame), true) = (frame, self.config.show_video) {
            display.blit(frame, self.camera_rect(0.0), self.config.mirror);
        }

        let analysis = match frame {
            None => Analysis::NoFrame,
            Some(frame) => self.analyze(frame, video_ready, display),
        };

        let RenderSummary { triggers, drawn } = self.grid.render(display, audio);

        let analysis = match analysis {
            Analysis::Analyzed { foreground_pixels, .. } => {
                let activated_cells = match &self.last_mask {
                    Some(mask) => self.grid.find_activations(mask, self.config.mirror),
                    None => 0,
                };
                Analysis::Analyzed {
                    foreground_pixels,
                    activated_cells,
                }
            }
            other => other,
        };

        self.finish(TickReport {
            tick,
            analysis,
            triggers,
            drawn,
        })
    }

    fn finish(&mut self, report: TickReport) -> TickReport {
        self.ticks += 1;
        if !report.triggers.is_empty() {
            debug!("[PIPELINE] tick {} triggered {:?}", report.tick, report.triggers);
        }
        report
    }

    /// Preprocesses and differences `frame`. The mask is kept for the
    /// activation step; the current analysis image becomes the next background.
    fn analyze(&mut self, frame: &PixelBuffer, video_ready: bool, display: &mut dyn Display) -> Analysis {
        let current = self.preprocess.apply(frame);

        if self.is_warming_up(video_ready) {
            self.previous = Some(current);
            self.last_mask = None;
            return Analysis::WarmingUp;
        }

        let threshold = self.threshold.value();
        let outcome = match self.previous.as_ref() {
            None => {
                self.last_mask = None;
                Analysis::FirstFrame
            }
            Some(previous) => match frame_differencer::diff(&current, previous, threshold) {
                Ok(mask) => {
                    let foreground_pixels = mask.foreground_count();
                    self.last_mask = Some(mask);
                    Analysis::Analyzed {
                        foreground_pixels,
                        activated_cells: 0,
                    }
                }
                Err(e) => {
                    warn!("[PIPELINE] {}; treating tick as still", e);
                    self.last_mask = None;
                    Analysis::DimensionMismatch
                }
            },
        };

        if self.config.show_video {
            if let Some(mask) = &self.last_mask {
                let painted = mask.to_pixel_buffer();
                display.blit(
                    &painted,
                    self.camera_rect(self.config.camera_width as f32),
                    self.config.mirror,
                );
            }
            display.text(&Text {
                content: threshold.to_string(),
                x: THRESHOLD_LABEL_POSITION.0,
                y: THRESHOLD_LABEL_POSITION.1,
                size: THRESHOLD_LABEL_SIZE,
                align: TextAlign::Left,
                color: Rgba::opaque(255.0, 255.0, 255.0),
            });
        }

        self.previous = Some(current);
        outcome
    }

    fn camera_rect(&self, x: f32) -> Rect {
        Rect {
            x,
            y: 0.0,
            width: self.config.camera_width as f32,
            height: self.config.camera_height as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::audio::SoundBank;
    use crate::core_modules::pixel::Pixel;
    use crate::core_modules::render::Recorder;

    fn raw_config() -> PipelineConfig {
        // Analyse frames as-is so single pixels survive.
        PipelineConfig {
            camera_width: 160,
            camera_height: 120,
            downsample: 1,
            blur_sigma: 0.0,
            startup_ticks: 0,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn threshold_control_clamps() {
        let mut control = ThresholdControl::new(40);
        control.set(-3);
        assert_eq!(control.value(), 0);
        control.set(1000);
        assert_eq!(control.value(), 255);
        control.nudge(-55);
        assert_eq!(control.value(), 200);
    }

    #[test]
    fn no_frame_means_no_motion() {
        let mut pipeline = MotionGrid::new(raw_config()).expect("valid config");
        let mut display = Recorder::default();
        let mut audio = SoundBank::simulated(4);
        let report = pipeline.tick(None, true, &mut display, &mut audio);
        assert_eq!(report.analysis, Analysis::NoFrame);
        assert_eq!(pipeline.ticks(), 1);
    }

    #[test]
    fn first_frame_is_treated_as_still() {
        let mut pipeline = MotionGrid::new(raw_config()).expect("valid config");
        let mut display = Recorder::default();
        let mut audio = SoundBank::simulated(4);
        let frame = PixelBuffer::filled(160, 120, Pixel::WHITE);
        let report = pipeline.tick(Some(&frame), true, &mut display, &mut audio);
        assert_eq!(report.analysis, Analysis::FirstFrame);
        assert!(pipeline.grid().cells().all(|c| !c.is_active()));
    }

    #[test]
    fn warm_up_holds_until_ticks_and_ready() {
        let config = PipelineConfig {
            startup_ticks: 2,
            ..raw_config()
        };
        let mut pipeline = MotionGrid::new(config).expect("valid config");
        let mut display = Recorder::default();
        let mut audio = SoundBank::simulated(4);
        let still = PixelBuffer::filled(160, 120, Pixel::BLACK);
        let bright = PixelBuffer::filled(160, 120, Pixel::WHITE);

        for frame in [&still, &bright] {
            let report = pipeline.tick(Some(frame), true, &mut display, &mut audio);
            assert_eq!(report.analysis, Analysis::WarmingUp);
        }
        // Enough ticks, but the camera is not ready yet.
        let report = pipeline.tick(Some(&still), false, &mut display, &mut audio);
        assert_eq!(report.analysis, Analysis::WarmingUp);
        assert!(pipeline.grid().cells().all(|c| !c.is_active()));

        // The frame kept during warm-up is the background for the first analysis.
        let report = pipeline.tick(Some(&bright), true, &mut display, &mut audio);
        assert!(matches!(report.analysis, Analysis::Analyzed { activated_cells: 192, .. }));
    }

    #[test]
    fn size_changes_are_treated_as_still() {
        let config = PipelineConfig {
            downsample: 1,
            blur_sigma: 0.0,
            startup_ticks: 0,
            ..PipelineConfig::default()
        };
        let mut pipeline = MotionGrid::new(config).expect("valid config");
        let mut display = Recorder::default();
        let mut audio = SoundBank::simulated(4);
        let small = PixelBuffer::filled(80, 60, Pixel::BLACK);
        let large = PixelBuffer::filled(160, 120, Pixel::WHITE);
        pipeline.tick(Some(&small), true, &mut display, &mut audio);
        let report = pipeline.tick(Some(&large), true, &mut display, &mut audio);
        assert_eq!(report.analysis, Analysis::DimensionMismatch);
        assert!(pipeline.grid().cells().all(|c| !c.is_active()));
    }

    #[test]
    fn motion_sounds_on_the_following_tick() {
        let mut pipeline = MotionGrid::new(raw_config()).expect("valid config");
        let mut display = Recorder::default();
        let mut audio = SoundBank::simulated(4);
        let before = PixelBuffer::filled(160, 120, Pixel::BLACK);
        let mut after = before.clone();
        after.set(0, 0, Pixel::WHITE);

        pipeline.tick(Some(&before), true, &mut display, &mut audio);
        let report = pipeline.tick(Some(&after), true, &mut display, &mut audio);
        assert_eq!(
            report.analysis,
            Analysis::Analyzed {
                foreground_pixels: 1,
                activated_cells: 1
            }
        );
        assert!(report.triggers.is_empty());

        let report = pipeline.tick(Some(&after), true, &mut display, &mut audio);
        assert_eq!(report.triggers.len(), 1);
        assert_eq!(report.triggers[0].to_string(), "c2");
    }

    #[test]
    fn video_panes_and_threshold_label_are_drawn() {
        let mut pipeline = MotionGrid::new(raw_config()).expect("valid config");
        let mut display = Recorder::default();
        let mut audio = SoundBank::simulated(4);
        let frame = PixelBuffer::filled(160, 120, Pixel::BLACK);
        pipeline.tick(Some(&frame), true, &mut display, &mut audio);
        display.clear();
        pipeline.tick(Some(&frame), true, &mut display, &mut audio);

        assert_eq!(display.blits.len(), 2);
        assert!(display.blits.iter().all(|(_, mirrored)| !*mirrored));
        assert_eq!(display.blits[1].0.x, 160.0);
        let label = display.texts().next().expect("threshold label");
        assert_eq!(label.content, "40");
    }

    #[test]
    fn lit_cells_sit_under_the_motion_on_screen() {
        for mirror in [false, true] {
            let config = PipelineConfig {
                mirror,
                ..raw_config()
            };
            let mut pipeline = MotionGrid::new(config).expect("valid config");
            let mut display = Recorder::default();
            let mut audio = SoundBank::simulated(4);
            let before = PixelBuffer::filled(160, 120, Pixel::BLACK);
            let mut after = before.clone();
            after.set(0, 0, Pixel::WHITE);

            pipeline.tick(Some(&before), true, &mut display, &mut audio);
            display.clear();
            pipeline.tick(Some(&after), true, &mut display, &mut audio);

            let (pane, mirrored) = display.blits[0];
            assert_eq!(mirrored, mirror);
            // Frame column 0 as the pane shows it, relative to the pane width.
            let shown_at = if mirrored { 1.0 - 0.5 / 160.0 } else { 0.5 / 160.0 };
            assert_eq!(pane.width, 160.0);

            let lit: Vec<_> = pipeline.grid().cells().filter(|c| c.is_active()).collect();
            assert_eq!(lit.len(), 1);
            let layout = pipeline.grid().layout();
            let left = (lit[0].column() as u32 * layout.cell_size) as f32 / layout.width as f32;
            let right = ((lit[0].column() as u32 + 1) * layout.cell_size) as f32 / layout.width as f32;
            assert!(
                left <= shown_at && shown_at < right,
                "mirror={mirror}: motion at {shown_at}, cell spans {left}..{right}"
            );
        }
    }
}
