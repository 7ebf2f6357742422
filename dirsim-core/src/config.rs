use std::path::{Path, PathBuf};
use std::time::Duration;

use dirsim_types::{DecayTarget, TempoConfig, Zone};
use serde::Deserialize;
use thiserror::Error;

use crate::controller::{ControllerSettings, DispatchSettings};
use crate::slider::SliderSettings;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    tempo: TempoSection,
    #[serde(default)]
    motion: MotionSection,
    #[serde(default)]
    pattern: PatternSection,
    #[serde(default)]
    osc: OscSection,
    #[serde(default)]
    dispatch: DispatchSection,
    #[serde(default)]
    sliders: SliderSection,
}

#[derive(Deserialize, Default)]
struct TempoSection {
    initial_bpm: Option<f64>,
    min_bpm: Option<f64>,
    max_bpm: Option<f64>,
}

#[derive(Deserialize, Default)]
struct MotionSection {
    speed_threshold: Option<f64>,
    still_threshold: Option<f64>,
    dead_zone: Option<f64>,
    decrease_rate: Option<f64>,
    decay_target: Option<DecayTarget>,
}

#[derive(Deserialize, Default)]
struct PatternSection {
    touch_count: Option<usize>,
    window_size: Option<usize>,
    sequence: Option<[Zone; 4]>,
    batched: Option<bool>,
}

#[derive(Deserialize, Default)]
struct OscSection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Deserialize, Default)]
struct DispatchSection {
    tempo_interval_ms: Option<u64>,
    slider_interval_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct SliderSection {
    min_value: Option<f32>,
    max_value: Option<f32>,
    initial_value: Option<f32>,
    primary_track: Option<u32>,
    secondary_track: Option<u32>,
}

/// Layered configuration: the embedded defaults with a user file on top.
pub struct Config {
    file: ConfigFile,
}

impl Config {
    /// Embedded defaults merged with `~/.config/dirsim/config.toml` when it
    /// exists. A broken user file is logged and ignored.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_file(&path) {
                    Ok(user) => config.merge(user),
                    Err(e) => log::warn!(target: "config", "ignoring {}", e),
                }
            }
        }
        config
    }

    /// Embedded defaults merged with an explicit file. Unlike [`Config::load`]
    /// a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let mut config = Self::embedded();
        config.merge(read_file(path)?);
        log::info!(target: "config", "loaded {}", path.display());
        Ok(config)
    }

    fn embedded() -> Self {
        let file = match toml::from_str(DEFAULT_CONFIG) {
            Ok(file) => file,
            Err(e) => {
                log::error!(target: "config", "embedded config.toml is invalid: {}", e);
                ConfigFile::default()
            }
        };
        Self { file }
    }

    fn merge(&mut self, user: ConfigFile) {
        let base = &mut self.file;
        merge(&mut base.tempo.initial_bpm, user.tempo.initial_bpm);
        merge(&mut base.tempo.min_bpm, user.tempo.min_bpm);
        merge(&mut base.tempo.max_bpm, user.tempo.max_bpm);

        merge(&mut base.motion.speed_threshold, user.motion.speed_threshold);
        merge(&mut base.motion.still_threshold, user.motion.still_threshold);
        merge(&mut base.motion.dead_zone, user.motion.dead_zone);
        merge(&mut base.motion.decrease_rate, user.motion.decrease_rate);
        merge(&mut base.motion.decay_target, user.motion.decay_target);

        merge(&mut base.pattern.touch_count, user.pattern.touch_count);
        merge(&mut base.pattern.window_size, user.pattern.window_size);
        merge(&mut base.pattern.sequence, user.pattern.sequence);
        merge(&mut base.pattern.batched, user.pattern.batched);

        merge(&mut base.osc.host, user.osc.host);
        merge(&mut base.osc.port, user.osc.port);

        merge(&mut base.dispatch.tempo_interval_ms, user.dispatch.tempo_interval_ms);
        merge(&mut base.dispatch.slider_interval_ms, user.dispatch.slider_interval_ms);
        merge(&mut base.dispatch.poll_interval_ms, user.dispatch.poll_interval_ms);

        merge(&mut base.sliders.min_value, user.sliders.min_value);
        merge(&mut base.sliders.max_value, user.sliders.max_value);
        merge(&mut base.sliders.initial_value, user.sliders.initial_value);
        merge(&mut base.sliders.primary_track, user.sliders.primary_track);
        merge(&mut base.sliders.secondary_track, user.sliders.secondary_track);
    }

    /// Estimator settings. An inconsistent combination falls back to the
    /// built-in defaults as a whole.
    pub fn tempo(&self) -> TempoConfig {
        let fallback = TempoConfig::default();
        let tempo = &self.file.tempo;
        let motion = &self.file.motion;
        let pattern = &self.file.pattern;
        let config = TempoConfig {
            min_bpm: tempo.min_bpm.unwrap_or(fallback.min_bpm),
            max_bpm: tempo.max_bpm.unwrap_or(fallback.max_bpm),
            initial_bpm: tempo.initial_bpm.unwrap_or(fallback.initial_bpm),
            sensitivity: motion.speed_threshold.unwrap_or(fallback.sensitivity),
            still_threshold: motion.still_threshold.unwrap_or(fallback.still_threshold),
            dead_zone: motion.dead_zone.unwrap_or(fallback.dead_zone),
            decrease_rate: motion.decrease_rate.unwrap_or(fallback.decrease_rate),
            decay_target: motion.decay_target.unwrap_or(fallback.decay_target),
            touch_count: pattern.touch_count.unwrap_or(fallback.touch_count),
            window_size: pattern.window_size.unwrap_or(fallback.window_size),
            batched: pattern.batched.unwrap_or(fallback.batched),
            sequence: pattern.sequence.unwrap_or(fallback.sequence),
        };
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!(target: "config", "invalid tempo settings ({}), using defaults", e);
                fallback
            }
        }
    }

    /// OSC destination as `(host, port)`.
    pub fn osc_target(&self) -> (String, u16) {
        let host = self
            .file
            .osc
            .host
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string());
        (host, self.file.osc.port.unwrap_or(57121))
    }

    /// Send cadence. Zero intervals are bumped to one millisecond.
    pub fn dispatch(&self) -> DispatchSettings {
        let fallback = DispatchSettings::default();
        let ms = |v: Option<u64>, default: Duration| {
            v.map(|ms| Duration::from_millis(ms.max(1))).unwrap_or(default)
        };
        DispatchSettings {
            tempo_interval: ms(self.file.dispatch.tempo_interval_ms, fallback.tempo_interval),
            slider_interval: ms(self.file.dispatch.slider_interval_ms, fallback.slider_interval),
            poll_interval: ms(self.file.dispatch.poll_interval_ms, fallback.poll_interval),
        }
    }

    pub fn sliders(&self) -> SliderSettings {
        let fallback = SliderSettings::default();
        let s = &self.file.sliders;
        let settings = SliderSettings {
            min_value: s.min_value.unwrap_or(fallback.min_value),
            max_value: s.max_value.unwrap_or(fallback.max_value),
            initial_value: s.initial_value.unwrap_or(fallback.initial_value),
        };
        if settings.min_value < settings.max_value {
            settings
        } else {
            log::warn!(target: "config", "slider min_value must be below max_value, using defaults");
            fallback
        }
    }

    pub fn primary_track(&self) -> u32 {
        self.file.sliders.primary_track.unwrap_or(5)
    }

    pub fn secondary_track(&self) -> u32 {
        self.file.sliders.secondary_track.unwrap_or(4)
    }

    /// Everything [`crate::TempoController::new`] needs.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            tempo: self.tempo(),
            dispatch: self.dispatch(),
            sliders: self.sliders(),
            primary_track: self.primary_track(),
            secondary_track: self.secondary_track(),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dirsim").join("config.toml"))
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge<T>(base: &mut Option<T>, user: Option<T>) {
    if user.is_some() {
        *base = user;
    }
}
