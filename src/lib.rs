// THEORY:
// This file is the entry point for the `motion_grid` library crate. The public
// face of the crate is `MotionGrid` (in `pipeline`) together with its
// `PipelineConfig`: feed it camera frames once per tick and it draws the grid
// and triggers sounds through whatever `Display` and `AudioPlayer` it is given.
//
// The building blocks (frame differencing, the grid, the note cells, the pitch
// mapping, audio and drawing seams) live in `core_modules` and stay usable on
// their own. `video` carries frames from a capture task to the tick loop.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod video;

pub use config::PipelineConfig;
pub use error::{MotionGridError, Result};
pub use pipeline::{Analysis, MotionGrid, TickReport};
