// THEORY:
// A `Cell` is one slot of the grid and the only stateful thing in the motion
// grid. It carries an activation level in [0, 1]:
// - motion over the cell pins the level to 1.0 (`activate`);
// - every tick the level falls by 0.05, so an untouched cell fades out over
//   twenty ticks and then rests at exactly 0.
// The level is stored as a count of remaining decay steps rather than a float.
// That keeps "exactly at the peak" and "exactly zero" exact, which the trigger
// rule depends on.
//
// A tick is two explicit phases:
// 1.  **Read and render**: if the cell sits at the peak, emit its pitch as a
//     trigger (this is the only moment a sound fires, so a fading cell never
//     retriggers). If the level is above zero, describe the pulse: a filled
//     circle that shrinks with the level, a hollow ring that grows as the
//     level falls, and the pitch label.
// 2.  **Decay**: drop one step, saturating at zero.
//
// A `NoteColumn` is one vertical strip of cells sharing a column index (in the
// musical reading: one "instrument" whose rows are octaves).

use crate::core_modules::pitch::{PitchName, pitch_for};
use crate::core_modules::render::{DrawCommand, Ellipse, Rgba, Text, TextAlign};

/// Number of ticks a fully activated cell takes to fade to zero.
pub const ACTIVATION_STEPS: u8 = 20;
/// Level lost per tick.
pub const DECAY_STEP: f32 = 1.0 / ACTIVATION_STEPS as f32;

/// Alpha of the filled circle at full activation.
const PULSE_ALPHA: f32 = 200.0;
const FIRST_COLUMN_COLOR: Rgba = Rgba::new(100.0, 0.0, 0.0, PULSE_ALPHA);
const LAST_COLUMN_COLOR: Rgba = Rgba::new(0.0, 0.0, 100.0, PULSE_ALPHA);
const PULSE_BORDER: Rgba = Rgba::opaque(255.0, 255.0, 0.0);
const RING_BORDER: Rgba = Rgba::opaque(255.0, 255.0, 255.0);
const PULSE_BORDER_WEIGHT: f32 = 3.0;
const RING_BORDER_WEIGHT: f32 = 2.0;

const LETTER_SIZE: f32 = 18.0;
const LETTER_COLOR: Rgba = Rgba::opaque(0.0, 255.0, 0.0);
const OCTAVE_SIZE: f32 = 12.0;
const OCTAVE_COLOR: Rgba = Rgba::opaque(200.0, 200.0, 200.0);
/// How far below the center the label sits at full activation.
const LABEL_DROP: f32 = 60.0;

/// Everything one cell produced during a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellTick {
    /// Pitch to sound, present only on the tick the cell sits at its peak.
    pub trigger: Option<PitchName>,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    column: usize,
    row: usize,
    center: (f32, f32),
    pitch: PitchName,
    /// Decay steps left before the cell is dark; `ACTIVATION_STEPS` is the peak.
    remaining: u8,
}

impl Cell {
    pub fn new(column: usize, row: usize, center: (f32, f32)) -> Self {
        Self {
            column,
            row,
            center,
            pitch: pitch_for(row, column),
            remaining: 0,
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn center(&self) -> (f32, f32) {
        self.center
    }

    pub fn pitch(&self) -> PitchName {
        self.pitch
    }

    /// Current activation level in [0, 1].
    pub fn level(&self) -> f32 {
        self.remaining as f32 / ACTIVATION_STEPS as f32
    }

    pub fn is_at_peak(&self) -> bool {
        self.remaining == ACTIVATION_STEPS
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Pins the level to the peak. Repeating it within a tick changes nothing.
    pub fn activate(&mut self) {
        self.remaining = ACTIVATION_STEPS;
    }

    /// Render phase: reads the level, mutates nothing.
    pub fn render(&self, cell_size: f32, total_columns: usize) -> CellTick {
        let trigger = self.is_at_peak().then_some(self.pitch);
        if !self.is_active() {
            return CellTick {
                trigger,
                commands: Vec::new(),
            };
        }

        let level = self.level();
        let (x, y) = self.center;
        let spread = if total_columns == 0 {
            0.0
        } else {
            self.column as f32 / total_columns as f32
        };
        let mut fill = FIRST_COLUMN_COLOR.lerp(LAST_COLUMN_COLOR, spread);
        fill.a = PULSE_ALPHA * level;

        let label_y = y + level * LABEL_DROP;
        let commands = vec![
            DrawCommand::Ellipse(Ellipse {
                x,
                y,
                diameter: cell_size * level,
                fill: Some(fill),
                stroke: PULSE_BORDER,
                stroke_weight: PULSE_BORDER_WEIGHT * level,
            }),
            DrawCommand::Ellipse(Ellipse {
                x,
                y,
                diameter: cell_size * (1.0 - level),
                fill: None,
                stroke: RING_BORDER,
                stroke_weight: RING_BORDER_WEIGHT * (1.0 - level),
            }),
            DrawCommand::Text(Text {
                content: self.pitch.letter().to_ascii_uppercase().to_string(),
                x,
                y: label_y,
                size: LETTER_SIZE,
                align: TextAlign::Center,
                color: LETTER_COLOR,
            }),
            DrawCommand::Text(Text {
                content: self.pitch.octave().to_string(),
                x: x + 10.0,
                y: label_y - 3.0,
                size: OCTAVE_SIZE,
                align: TextAlign::Center,
                color: OCTAVE_COLOR,
            }),
        ];

        CellTick { trigger, commands }
    }

    /// Decay phase: one step down, never below zero.
    pub fn decay(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Render, then decay.
    pub fn tick(&mut self, cell_size: f32, total_columns: usize) -> CellTick {
        let result = self.render(cell_size, total_columns);
        self.decay();
        result
    }
}

/// One vertical strip of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteColumn {
    index: usize,
    cell_size: f32,
    cells: Vec<Cell>,
}

impl NoteColumn {
    /// Builds a column with one cell per center, top to bottom.
    pub fn new(index: usize, cell_size: f32, centers: &[(f32, f32)]) -> Self {
        let cells = centers
            .iter()
            .enumerate()
            .map(|(row, center)| Cell::new(index, row, *center))
            .collect();
        Self {
            index,
            cell_size,
            cells,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, row: usize) -> Option<&Cell> {
        self.cells.get(row)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Activates the cell at `row`. Returns `false` when the row does not exist.
    pub fn activate(&mut self, row: usize) -> bool {
        match self.cells.get_mut(row) {
            Some(cell) => {
                cell.activate();
                true
            }
            None => false,
        }
    }

    /// Ticks every cell top to bottom.
    pub fn tick(&mut self, total_columns: usize) -> Vec<CellTick> {
        let cell_size = self.cell_size;
        self.cells
            .iter_mut()
            .map(|cell| cell.tick(cell_size, total_columns))
            .collect()
    }
}
