// THEORY:
// The grid only needs three things from whatever makes sound: "is this pitch
// still sounding?", "play it", and "replay from the start rather than layer".
// `AudioPlayer` is exactly that seam.
//
// `SoundBank` is the implementation the crate ships. It plays the role the asset
// preloader plays in a browser sketch:
// - `preload` scans an asset directory for one sample per key and octave, named
//   `{key}{octave}.ogg` (`c-` marks the sharp), and keeps the ones it finds;
// - playback is tick-driven. A sound lasts a fixed number of ticks, counted down
//   by `advance`, which gives `is_playing` its meaning without a real mixer.
// A pitch with no sample surfaces as `MissingAsset`; callers skip the sound and
// carry on.

use crate::core_modules::pitch::{MAX_OCTAVE, MIN_OCTAVE, PitchName, SOUND_EXTENSION, SOUND_KEYS};
use crate::error::{MotionGridError, Result};
use log::{debug, info, trace};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How `play` behaves on a sound that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Ignore the request until the current playback ends.
    #[default]
    Sustain,
    /// Cut the current playback and start again immediately.
    Restart,
}

pub trait AudioPlayer {
    fn is_playing(&self, key: &PitchName) -> Result<bool>;

    fn play(&mut self, key: &PitchName) -> Result<()>;

    fn set_play_mode(&mut self, key: &PitchName, mode: PlayMode) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Sound {
    /// Sample on disk; `None` for banks built without files.
    path: Option<PathBuf>,
    mode: PlayMode,
    /// Ticks of playback left.
    remaining: u32,
    /// Times playback actually started.
    starts: u32,
}

impl Sound {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            mode: PlayMode::default(),
            remaining: 0,
            starts: 0,
        }
    }
}

/// Samples keyed by pitch name, played for a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct SoundBank {
    sounds: HashMap<String, Sound>,
    duration_ticks: u32,
}

impl SoundBank {
    /// Every `{key}{octave}` name the asset set is recorded for.
    pub fn asset_names() -> impl Iterator<Item = String> {
        SOUND_KEYS
            .iter()
            .flat_map(|key| (MIN_OCTAVE..=MAX_OCTAVE).map(move |octave| format!("{key}{octave}")))
    }

    /// Loads every sample present in `dir`.
    pub fn preload<P: AsRef<Path>>(dir: P, duration_ticks: u32) -> Result<Self> {
        let dir = dir.as_ref();
        if !std::fs::metadata(dir)?.is_dir() {
            return Err(MotionGridError::InvalidConfig(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut sounds = HashMap::new();
        for name in Self::asset_names() {
            let path = dir.join(format!("{name}.{SOUND_EXTENSION}"));
            if path.is_file() {
                sounds.insert(name, Sound::new(Some(path)));
            } else {
                debug!("[AUDIO] no sample at {}", path.display());
            }
        }
        info!("[AUDIO] loaded {} samples from {}", sounds.len(), dir.display());

        Ok(Self {
            sounds,
            duration_ticks,
        })
    }

    /// A bank with the given keys and no files behind them.
    pub fn with_keys<I, S>(keys: I, duration_ticks: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sounds = keys
            .into_iter()
            .map(|k| (k.into(), Sound::new(None)))
            .collect();
        Self {
            sounds,
            duration_ticks,
        }
    }

    /// A bank with every recorded key and no files, for running without assets.
    pub fn simulated(duration_ticks: u32) -> Self {
        Self::with_keys(Self::asset_names(), duration_ticks)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn contains(&self, key: &PitchName) -> bool {
        self.sounds.contains_key(&key.to_string())
    }

    pub fn path(&self, key: &PitchName) -> Option<&Path> {
        self.sounds.get(&key.to_string()).and_then(|s| s.path.as_deref())
    }

    /// How many times playback of `key` has started.
    pub fn start_count(&self, key: &PitchName) -> u32 {
        self.sounds.get(&key.to_string()).map(|s| s.starts).unwrap_or(0)
    }

    /// Moves every playing sound one tick closer to its end.
    pub fn advance(&mut self) {
        for sound in self.sounds.values_mut() {
            sound.remaining = sound.remaining.saturating_sub(1);
        }
    }

    fn sound(&self, key: &PitchName) -> Result<&Sound> {
        self.sounds
            .get(&key.to_string())
            .ok_or_else(|| MotionGridError::MissingAsset(key.to_string()))
    }

    fn sound_mut(&mut self, key: &PitchName) -> Result<&mut Sound> {
        self.sounds
            .get_mut(&key.to_string())
            .ok_or_else(|| MotionGridError::MissingAsset(key.to_string()))
    }
}

impl AudioPlayer for SoundBank {
    fn is_playing(&self, key: &PitchName) -> Result<bool> {
        Ok(self.sound(key)?.remaining > 0)
    }

    fn play(&mut self, key: &PitchName) -> Result<()> {
        let duration = self.duration_ticks;
        let sound = self.sound_mut(key)?;
        if sound.remaining > 0 && sound.mode == PlayMode::Sustain {
            return Ok(());
        }
        sound.remaining = duration;
        sound.starts += 1;
        trace!("[AUDIO] playing {}", key);
        Ok(())
    }

    fn set_play_mode(&mut self, key: &PitchName, mode: PlayMode) -> Result<()> {
        self.sound_mut(key)?.mode = mode;
        Ok(())
    }
}
