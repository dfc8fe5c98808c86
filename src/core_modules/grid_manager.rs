// THEORY:
// The `Grid` owns every cell and is the bridge between the pixel world and the
// note world. It does three things:
// 1.  **Partition**: at construction it steps across its region in `cell_size`
//     strides, column-major (outer loop over x, inner over y). A region that is
//     not a multiple of the cell size gets a partial last column/row, so
//     `columns = ceil(width / cell_size)` and `rows = ceil(height / cell_size)`.
// 2.  **Activation**: given a motion mask it scales every foreground pixel into
//     grid space, optionally mirrored left/right so the grid matches a mirrored
//     camera view, and activates the cell under it. The scan walks a square as
//     large as the larger mask dimension, so no pixel of a non-square mask is
//     missed; coordinates that fall outside the mask read as "no motion".
//     Column and row indices are clamped to the real grid bounds.
// 3.  **Rendering**: it ticks every cell, forwards their draw commands to the
//     display and their triggers to the audio collaborator.

use crate::core_modules::audio::{AudioPlayer, PlayMode};
use crate::core_modules::frame_differencer::MotionMask;
use crate::core_modules::note::{Cell, NoteColumn};
use crate::core_modules::pitch::PitchName;
use crate::core_modules::render::Display;
use crate::error::{MotionGridError, Result};
use log::{debug, warn};

/// Placement and cell size of a grid, in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub width: u32,
    pub height: u32,
    pub origin_x: u32,
    pub origin_y: u32,
    pub cell_size: u32,
}

/// What one `render` pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSummary {
    /// Pitches that reached their peak this tick, column-major.
    pub triggers: Vec<PitchName>,
    /// Cells drawn (level above zero before decay).
    pub drawn: usize,
}

pub struct Grid {
    layout: GridLayout,
    columns: Vec<NoteColumn>,
    rows: usize,
}

impl Grid {
    /// Partitions `layout` into cells, all at level zero.
    pub fn new(layout: GridLayout) -> Result<Self> {
        if layout.cell_size == 0 {
            return Err(MotionGridError::InvalidConfig("cell size must be positive".into()));
        }
        if layout.width == 0 || layout.height == 0 {
            return Err(MotionGridError::InvalidConfig(format!(
                "grid region {}x{} is empty",
                layout.width, layout.height
            )));
        }

        let end = |origin: u32, extent: u32, axis: &str| {
            origin.checked_add(extent).ok_or_else(|| {
                MotionGridError::InvalidConfig(format!(
                    "grid {axis} origin {origin} + extent {extent} overflows"
                ))
            })
        };
        let end_x = end(layout.origin_x, layout.width, "x")?;
        let end_y = end(layout.origin_y, layout.height, "y")?;

        let size = layout.cell_size;
        let half = size as f32 / 2.0;
        let mut columns = Vec::new();

        for x in (layout.origin_x..end_x).step_by(size as usize) {
            let centers: Vec<(f32, f32)> = (layout.origin_y..end_y)
                .step_by(size as usize)
                .map(|y| (x as f32 + half, y as f32 + half))
                .collect();
            columns.push(NoteColumn::new(columns.len(), size as f32, &centers));
        }

        let rows = columns.first().map(NoteColumn::len).unwrap_or(0);
        debug!(
            "[GRID] {}x{} region at ({}, {}) split into {} columns x {} rows of {}px",
            layout.width,
            layout.height,
            layout.origin_x,
            layout.origin_y,
            columns.len(),
            rows,
            size
        );

        Ok(Self {
            layout,
            columns,
            rows,
        })
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[NoteColumn] {
        &self.columns
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&Cell> {
        self.columns.get(column).and_then(|c| c.cell(row))
    }

    /// Every cell, column-major.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.columns.iter().flat_map(|c| c.cells().iter())
    }

    pub fn activate(&mut self, column: usize, row: usize) -> bool {
        match self.columns.get_mut(column) {
            Some(c) => c.activate(row),
            None => false,
        }
    }

    /// Cell indices under a point of the mask. Indices are clamped to the grid.
    pub fn locate(&self, x: u32, y: u32, mask_width: u32, mask_height: u32, mirrored: bool) -> (usize, usize) {
        let grid_w = self.layout.width as f64;
        let grid_h = self.layout.height as f64;
        let size = self.layout.cell_size as f64;

        let along_x = x as f64 / mask_width.max(1) as f64;
        let along_y = y as f64 / mask_height.max(1) as f64;
        let screen_x = if mirrored {
            grid_w - along_x * grid_w
        } else {
            along_x * grid_w
        };
        let screen_y = along_y * grid_h;

        let last_column = self.columns.len().saturating_sub(1);
        let last_row = self.rows.saturating_sub(1);
        let column = ((screen_x / size).floor().max(0.0) as usize).min(last_column);
        let row = ((screen_y / size).floor().max(0.0) as usize).min(last_row);
        (column, row)
    }

    /// Activates every cell that has at least one foreground pixel over it.
    /// Returns how many distinct cells were activated.
    pub fn find_activations(&mut self, mask: &MotionMask, mirrored: bool) -> usize {
        let (width, height) = (mask.width(), mask.height());
        let largest = width.max(height) as usize;
        let mut hit = vec![false; self.columns.len() * self.rows];

        for i in 0..largest * largest {
            let x = (i / largest) as u32;
            let y = (i % largest) as u32;
            // The square scan overshoots the short side of a non-square mask.
            if x >= width || y >= height {
                continue;
            }
            let offset = y as usize * width as usize + x as usize;
            if !mask.at_offset(offset) {
                continue;
            }

            let (column, row) = self.locate(x, y, width, height, mirrored);
            debug_assert!(column < self.columns.len() && row < self.rows);
            if self.activate(column, row) {
                hit[column * self.rows + row] = true;
            }
        }

        let activated = hit.iter().filter(|h| **h).count();
        if activated > 0 {
            debug!("[GRID] {} cells activated", activated);
        }
        activated
    }

    /// Ticks every cell: draws what is lit, sounds what just peaked, then decays.
    pub fn render(&mut self, display: &mut dyn Display, audio: &mut dyn AudioPlayer) -> RenderSummary {
        let total_columns = self.columns.len();
        let mut summary = RenderSummary::default();

        for column in &mut self.columns {
            for tick in column.tick(total_columns) {
                if !tick.commands.is_empty() {
                    summary.drawn += 1;
                }
                for command in &tick.commands {
                    display.draw(command);
                }
                if let Some(pitch) = tick.trigger {
                    sound(audio, &pitch);
                    summary.triggers.push(pitch);
                }
            }
        }

        summary
    }
}

/// Plays `pitch` unless it is still sounding. A missing sample is not fatal:
/// the visual pulse has already been drawn.
fn sound(audio: &mut dyn AudioPlayer, pitch: &PitchName) {
    let result = audio.is_playing(pitch).and_then(|playing| {
        if playing {
            return Ok(());
        }
        audio.set_play_mode(pitch, PlayMode::Restart)?;
        audio.play(pitch)
    });
    match result {
        Ok(()) => {}
        Err(MotionGridError::MissingAsset(key)) => warn!("[AUDIO] no sample for {}, skipping playback", key),
        Err(e) => warn!("[AUDIO] playback of {} failed: {}", pitch, e),
    }
}
