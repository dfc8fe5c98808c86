// THEORY:
// The headless runner. It wires the library together the way an interactive host
// would: a capture task publishes frames, a fixed-rate tick loop feeds the newest
// one to `MotionGrid`, a software `Canvas` receives the drawing and a `SoundBank`
// receives the triggers.
//
// Without a camera, the capture task is a `SyntheticSource`. Without an asset
// directory, the sound bank is simulated and the triggers only show up in the
// logs. `MOTION_GRID_TICKS` bounds the run and `MOTION_GRID_SNAPSHOT` saves the
// last frame as a PNG; otherwise it runs until Ctrl-C.

use anyhow::Context;
use log::{info, warn};
use motion_grid::core_modules::audio::SoundBank;
use motion_grid::core_modules::render::Canvas;
use motion_grid::pipeline::Analysis;
use motion_grid::video::{self, SyntheticSource};
use motion_grid::{MotionGrid, PipelineConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = PipelineConfig::from_env().context("loading configuration")?;

    let mut audio = match &config.asset_dir {
        Some(dir) => SoundBank::preload(dir, config.sound_duration_ticks)
            .with_context(|| format!("loading samples from {}", dir.display()))?,
        None => {
            warn!("[AUDIO] no asset directory configured, sounds are simulated");
            SoundBank::simulated(config.sound_duration_ticks)
        }
    };

    let period = Duration::from_secs_f64(1.0 / config.tick_hz as f64);
    let (publisher, feed) = video::channel();
    let source = SyntheticSource::new(config.camera_width, config.camera_height);
    let capture = video::spawn_source(source, publisher, period, config.startup_ticks);

    let (display_width, display_height) = config.display_size();
    let mut canvas = Canvas::new(display_width, display_height);
    let run_ticks = config.run_ticks;
    let snapshot_path = config.snapshot_path.clone();
    let mut pipeline = MotionGrid::new(config).context("building the grid")?;

    let mut interval = tokio::time::interval(period);
    let mut triggered = 0usize;
    let mut analyzed = 0u64;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        if run_ticks.is_some_and(|limit| pipeline.ticks() >= limit) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut interrupted => {
                info!("[PIPELINE] interrupted");
                break;
            }
        }

        canvas.clear();
        let frame = feed.latest();
        let report = pipeline.tick(frame.as_deref(), feed.is_ready(), &mut canvas, &mut audio);
        audio.advance();

        if matches!(report.analysis, Analysis::Analyzed { .. }) {
            analyzed += 1;
        }
        for pitch in &report.triggers {
            info!("[AUDIO] {}", pitch);
        }
        triggered += report.triggers.len();
    }
    capture.abort();

    if let Some(path) = snapshot_path {
        canvas
            .save_png(&path)
            .with_context(|| format!("saving snapshot to {}", path.display()))?;
        info!("[CANVAS] snapshot written to {}", path.display());
    }

    info!(
        "[PIPELINE] {} ticks, {} analysed, {} notes triggered",
        pipeline.ticks(),
        analyzed,
        triggered
    );
    Ok(())
}
