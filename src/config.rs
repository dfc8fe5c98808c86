// THEORY:
// All the tunable numbers of the motion grid live in one `PipelineConfig`. The
// defaults reproduce the classic setup: a 640x480 camera analysed at a quarter
// resolution with a 3px blur, a 16x12 grid of 40px cells over the same area, and
// a motion threshold of 40.
//
// Configuration is layered:
// 1.  `Default` values;
// 2.  an optional JSON file (every field optional, unknown fields rejected);
// 3.  environment overrides for the few knobs worth flipping from a shell.
// `validate` runs last and refuses anything that cannot build a grid.

use crate::core_modules::grid_manager::GridLayout;
use crate::core_modules::pixel_buffer::Preprocess;
use crate::error::{MotionGridError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MOTION_GRID_CONFIG";
pub const THRESHOLD_ENV: &str = "MOTION_GRID_THRESHOLD";
pub const TICKS_ENV: &str = "MOTION_GRID_TICKS";
pub const ASSETS_ENV: &str = "MOTION_GRID_ASSETS";
pub const SNAPSHOT_ENV: &str = "MOTION_GRID_SNAPSHOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Camera frame size in pixels.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Integer divisor applied to the camera frame before differencing.
    pub downsample: u32,
    /// Gaussian blur sigma applied after downsampling; 0 disables it.
    pub blur_sigma: f32,
    /// Grid region and cell size, in display pixels.
    pub grid_width: u32,
    pub grid_height: u32,
    pub grid_x: u32,
    pub grid_y: u32,
    pub cell_size: u32,
    /// Initial motion threshold (RGB distance, 0-255).
    pub threshold: u8,
    /// Mirror left/right: the video panes and the mask-to-grid mapping flip together.
    pub mirror: bool,
    /// Ticks to wait before the analysis runs at all.
    pub startup_ticks: u32,
    /// Blit the camera frame and the mask next to each other every tick.
    pub show_video: bool,
    /// How long one triggered sample sounds, in ticks.
    pub sound_duration_ticks: u32,
    /// Directory holding `{key}{octave}.ogg` samples.
    pub asset_dir: Option<PathBuf>,
    /// Tick loop rate.
    pub tick_hz: u32,
    /// Stop after this many ticks; run forever when unset.
    pub run_ticks: Option<u64>,
    /// Write the final display frame here as a PNG.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_width: 640,
            camera_height: 480,
            downsample: 4,
            blur_sigma: 3.0,
            grid_width: 640,
            grid_height: 480,
            grid_x: 0,
            grid_y: 0,
            cell_size: 40,
            threshold: 40,
            mirror: false,
            startup_ticks: 30,
            show_video: true,
            sound_duration_ticks: 6,
            asset_dir: None,
            tick_hz: 60,
            run_ticks: None,
            snapshot_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn grid_layout(&self) -> GridLayout {
        GridLayout {
            width: self.grid_width,
            height: self.grid_height,
            origin_x: self.grid_x,
            origin_y: self.grid_y,
            cell_size: self.cell_size,
        }
    }

    pub fn preprocess(&self) -> Preprocess {
        Preprocess {
            downsample: self.downsample,
            blur_sigma: self.blur_sigma,
        }
    }

    /// Size of the display the pipeline draws on: camera view and mask side by
    /// side, tall enough for the grid.
    pub fn display_size(&self) -> (u32, u32) {
        let width = self
            .camera_width
            .saturating_mul(2)
            .max(self.grid_x.saturating_add(self.grid_width));
        let height = self
            .camera_height
            .max(self.grid_y.saturating_add(self.grid_height));
        (width, height)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(MotionGridError::InvalidConfig(reason.to_string()));
        if self.cell_size == 0 {
            return invalid("cell_size must be positive");
        }
        if self.downsample == 0 {
            return invalid("downsample must be positive");
        }
        if self.camera_width == 0 || self.camera_height == 0 {
            return invalid("camera frame is empty");
        }
        if self.grid_width == 0 || self.grid_height == 0 {
            return invalid("grid region is empty");
        }
        if self.camera_width.checked_mul(2).is_none()
            || self.grid_x.checked_add(self.grid_width).is_none()
            || self.grid_y.checked_add(self.grid_height).is_none()
        {
            return invalid("display area does not fit in 32-bit coordinates");
        }
        if self.tick_hz == 0 {
            return invalid("tick_hz must be positive");
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return invalid("blur_sigma must be a non-negative number");
        }
        Ok(())
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        info!("[CONFIG] loaded {}", path.as_ref().display());
        Ok(config)
    }

    /// Defaults, then the file named by `MOTION_GRID_CONFIG`, then single-value
    /// environment overrides. The result is validated.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from any key/value lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(THRESHOLD_ENV) {
            match raw.trim().parse::<i64>() {
                Ok(v) => self.threshold = v.clamp(0, 255) as u8,
                Err(_) => warn!("[CONFIG] ignoring {}={:?}", THRESHOLD_ENV, raw),
            }
        }
        if let Some(raw) = lookup(TICKS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(v) => self.run_ticks = Some(v),
                Err(_) => warn!("[CONFIG] ignoring {}={:?}", TICKS_ENV, raw),
            }
        }
        if let Some(raw) = lookup(ASSETS_ENV) {
            self.asset_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup(SNAPSHOT_ENV) {
            self.snapshot_path = Some(PathBuf::from(raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_describe_the_16_by_12_grid() {
        let config = PipelineConfig::default();
        config.validate().expect("defaults are valid");
        assert_eq!(config.grid_layout().cell_size, 40);
        assert_eq!(config.preprocess().output_dimensions(640, 480), (160, 120));
        assert_eq!(config.display_size(), (1280, 480));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "threshold": 90, "mirror": true }"#).expect("valid json");
        assert_eq!(config.threshold, 90);
        assert!(config.mirror);
        assert_eq!(config.cell_size, 40);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: std::result::Result<PipelineConfig, _> = serde_json::from_str(r#"{ "treshold": 90 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_sizes_fail_validation() {
        let config = PipelineConfig {
            cell_size: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(MotionGridError::InvalidConfig(_))));
        let config = PipelineConfig {
            downsample: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn regions_past_the_coordinate_range_fail_validation() {
        let parsed: PipelineConfig =
            serde_json::from_str(r#"{ "grid_x": 4294967290 }"#).expect("valid json");
        assert!(matches!(parsed.validate(), Err(MotionGridError::InvalidConfig(_))));
        let config = PipelineConfig {
            camera_width: u32::MAX,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.display_size().0, u32::MAX);
    }

    #[test]
    fn overrides_clamp_and_skip_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            (THRESHOLD_ENV, "900"),
            (TICKS_ENV, "soon"),
            (ASSETS_ENV, "/tmp/sounds"),
        ]);
        let mut config = PipelineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.threshold, 255);
        assert_eq!(config.run_ticks, None);
        assert_eq!(config.asset_dir, Some(PathBuf::from("/tmp/sounds")));
    }

    #[test]
    fn load_reads_a_file() {
        let path = std::env::temp_dir().join("motion_grid_config_test.json");
        std::fs::write(&path, r#"{ "cell_size": 20, "startup_ticks": 0 }"#).expect("write config");
        let config = PipelineConfig::load(&path).expect("valid file");
        assert_eq!(config.cell_size, 20);
        assert_eq!(config.startup_ticks, 0);
        let _ = std::fs::remove_file(path);
    }
}
