//! Tempo configuration and the runtime update surface.
//!
//! `TempoConfig` is created once at startup and mutated in place through
//! [`TempoConfig::apply`], which keeps `min_bpm <= initial_bpm <= max_bpm`.
//! A rejected update leaves the configuration untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::zone::{Zone, DEFAULT_SEQUENCE};

/// Where the motion estimator drifts when the hand is still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayTarget {
    /// Decay toward `min_bpm`.
    #[default]
    Floor,
    /// Decay toward `initial_bpm` (resting tempo).
    Resting,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
    #[error("invalid value {value} for {key}")]
    InvalidValue { key: &'static str, value: f64 },
    #[error("min_bpm {min} would exceed max_bpm {max}")]
    RangeViolation { min: f64, max: f64 },
    #[error("sensitivity {sensitivity} must be above dead_zone {dead_zone}")]
    SensitivityBelowDeadZone { sensitivity: f64, dead_zone: f64 },
    #[error("touch_count must be at least 2 (got {0})")]
    TouchCountTooSmall(usize),
}

/// One recognized runtime configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConfigUpdate {
    MinBpm(f64),
    MaxBpm(f64),
    InitialBpm(f64),
    /// Speed (px/s) that maps to `max_bpm`.
    Sensitivity(f64),
    TouchCount(usize),
}

impl ConfigUpdate {
    /// Build an update from the string key used by the control surface
    /// (`MIN_BPM`, `MAX_BPM`, `INITIAL_BPM`, `SENSITIVITY`, `TOUCH_COUNT`).
    pub fn parse(key: &str, value: f64) -> Result<Self, ConfigError> {
        match key.trim().to_uppercase().as_str() {
            "MIN_BPM" => Ok(ConfigUpdate::MinBpm(value)),
            "MAX_BPM" => Ok(ConfigUpdate::MaxBpm(value)),
            "INITIAL_BPM" => Ok(ConfigUpdate::InitialBpm(value)),
            "SENSITIVITY" => Ok(ConfigUpdate::Sensitivity(value)),
            "TOUCH_COUNT" => {
                if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
                    return Err(ConfigError::InvalidValue {
                        key: "TOUCH_COUNT",
                        value,
                    });
                }
                Ok(ConfigUpdate::TouchCount(value as usize))
            }
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ConfigUpdate::MinBpm(_) => "MIN_BPM",
            ConfigUpdate::MaxBpm(_) => "MAX_BPM",
            ConfigUpdate::InitialBpm(_) => "INITIAL_BPM",
            ConfigUpdate::Sensitivity(_) => "SENSITIVITY",
            ConfigUpdate::TouchCount(_) => "TOUCH_COUNT",
        }
    }
}

/// Largest touch window a configuration may ask for.
pub const MAX_WINDOW_SIZE: usize = 64;

/// Tempo estimation parameters shared by both estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub initial_bpm: f64,
    /// Average speed (px/s) that maps to `max_bpm`.
    pub sensitivity: f64,
    /// Below this average speed the hand is still and the tempo decays.
    pub still_threshold: f64,
    /// Speeds below this never raise the tempo.
    pub dead_zone: f64,
    /// BPM lost per second while still.
    pub decrease_rate: f64,
    pub decay_target: DecayTarget,
    /// Accepted touches per BPM recomputation (also the sample span).
    /// Never larger than `window_size`.
    pub touch_count: usize,
    /// Capacity of the touch timestamp window, at most [`MAX_WINDOW_SIZE`].
    pub window_size: usize,
    /// Recompute every `touch_count` touches instead of on every touch.
    pub batched: bool,
    pub sequence: [Zone; 4],
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 100.0,
            max_bpm: 125.0,
            initial_bpm: 104.0,
            sensitivity: 1000.0,
            still_threshold: 100.0,
            dead_zone: 80.0,
            decrease_rate: 0.5,
            decay_target: DecayTarget::Floor,
            touch_count: 4,
            window_size: 4,
            batched: true,
            sequence: DEFAULT_SEQUENCE,
        }
    }
}

impl TempoConfig {
    /// Check a whole configuration (e.g. freshly loaded from a file).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("MIN_BPM", self.min_bpm),
            ("MAX_BPM", self.max_bpm),
            ("INITIAL_BPM", self.initial_bpm),
        ] {
            check_bpm(key, value)?;
        }
        if self.min_bpm > self.max_bpm {
            return Err(ConfigError::RangeViolation {
                min: self.min_bpm,
                max: self.max_bpm,
            });
        }
        if self.initial_bpm < self.min_bpm || self.initial_bpm > self.max_bpm {
            return Err(ConfigError::InvalidValue {
                key: "INITIAL_BPM",
                value: self.initial_bpm,
            });
        }
        if self.sensitivity <= self.dead_zone {
            return Err(ConfigError::SensitivityBelowDeadZone {
                sensitivity: self.sensitivity,
                dead_zone: self.dead_zone,
            });
        }
        if self.decrease_rate < 0.0 || !self.decrease_rate.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "DECREASE_RATE",
                value: self.decrease_rate,
            });
        }
        if self.touch_count < 2 {
            return Err(ConfigError::TouchCountTooSmall(self.touch_count));
        }
        if self.window_size < 2 || self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "WINDOW_SIZE",
                value: self.window_size as f64,
            });
        }
        if self.touch_count > self.window_size {
            return Err(ConfigError::InvalidValue {
                key: "TOUCH_COUNT",
                value: self.touch_count as f64,
            });
        }
        Ok(())
    }

    /// Apply one update, enforcing the BPM ordering invariant.
    ///
    /// Returns the effective updates the estimators must see, in order.
    /// Narrowing the range past `initial_bpm` clamps it and appends an
    /// `InitialBpm` update; an out-of-range `InitialBpm` is clamped.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<Vec<ConfigUpdate>, ConfigError> {
        let mut effective = Vec::with_capacity(2);
        match update {
            ConfigUpdate::MinBpm(min) => {
                check_bpm("MIN_BPM", min)?;
                if min > self.max_bpm {
                    return Err(ConfigError::RangeViolation {
                        min,
                        max: self.max_bpm,
                    });
                }
                self.min_bpm = min;
                effective.push(update);
                if self.initial_bpm < min {
                    self.initial_bpm = min;
                    effective.push(ConfigUpdate::InitialBpm(min));
                }
            }
            ConfigUpdate::MaxBpm(max) => {
                check_bpm("MAX_BPM", max)?;
                if max < self.min_bpm {
                    return Err(ConfigError::RangeViolation {
                        min: self.min_bpm,
                        max,
                    });
                }
                self.max_bpm = max;
                effective.push(update);
                if self.initial_bpm > max {
                    self.initial_bpm = max;
                    effective.push(ConfigUpdate::InitialBpm(max));
                }
            }
            ConfigUpdate::InitialBpm(initial) => {
                check_bpm("INITIAL_BPM", initial)?;
                let clamped = initial.clamp(self.min_bpm, self.max_bpm);
                self.initial_bpm = clamped;
                effective.push(ConfigUpdate::InitialBpm(clamped));
            }
            ConfigUpdate::Sensitivity(sensitivity) => {
                if !sensitivity.is_finite() || sensitivity <= self.dead_zone {
                    return Err(ConfigError::SensitivityBelowDeadZone {
                        sensitivity,
                        dead_zone: self.dead_zone,
                    });
                }
                self.sensitivity = sensitivity;
                effective.push(update);
            }
            ConfigUpdate::TouchCount(count) => {
                if count < 2 {
                    return Err(ConfigError::TouchCountTooSmall(count));
                }
                if count > self.window_size {
                    return Err(ConfigError::InvalidValue {
                        key: "TOUCH_COUNT",
                        value: count as f64,
                    });
                }
                self.touch_count = count;
                effective.push(update);
            }
        }
        Ok(effective)
    }
}

fn check_bpm(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(TempoConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            ConfigUpdate::parse("MIN_BPM", 90.0),
            Ok(ConfigUpdate::MinBpm(90.0))
        );
        assert_eq!(
            ConfigUpdate::parse("touch_count", 2.0),
            Ok(ConfigUpdate::TouchCount(2))
        );
        assert_eq!(
            ConfigUpdate::parse("FPS", 30.0),
            Err(ConfigError::UnknownKey("FPS".to_string()))
        );
        assert!(ConfigUpdate::parse("TOUCH_COUNT", 2.5).is_err());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let mut config = TempoConfig::default();
        let before = config.clone();
        let result = config.apply(ConfigUpdate::MinBpm(130.0));
        assert_eq!(
            result,
            Err(ConfigError::RangeViolation {
                min: 130.0,
                max: 125.0
            })
        );
        assert_eq!(config, before);
    }

    #[test]
    fn test_max_below_min_rejected() {
        let mut config = TempoConfig::default();
        assert!(config.apply(ConfigUpdate::MaxBpm(90.0)).is_err());
        assert_eq!(config.max_bpm, 125.0);
    }

    #[test]
    fn test_narrowing_range_clamps_initial() {
        let mut config = TempoConfig::default();
        let effective = config.apply(ConfigUpdate::MinBpm(110.0)).unwrap();
        assert_eq!(
            effective,
            vec![ConfigUpdate::MinBpm(110.0), ConfigUpdate::InitialBpm(110.0)]
        );
        assert_eq!(config.initial_bpm, 110.0);

        let effective = config.apply(ConfigUpdate::MaxBpm(105.0 + 10.0)).unwrap();
        assert_eq!(effective, vec![ConfigUpdate::MaxBpm(115.0)]);
    }

    #[test]
    fn test_initial_clamped_into_range() {
        let mut config = TempoConfig::default();
        let effective = config.apply(ConfigUpdate::InitialBpm(200.0)).unwrap();
        assert_eq!(effective, vec![ConfigUpdate::InitialBpm(125.0)]);
        assert!(config.min_bpm <= config.initial_bpm && config.initial_bpm <= config.max_bpm);
    }

    #[test]
    fn test_sensitivity_and_touch_count_guards() {
        let mut config = TempoConfig::default();
        assert!(config.apply(ConfigUpdate::Sensitivity(50.0)).is_err());
        assert_eq!(
            config.apply(ConfigUpdate::TouchCount(1)),
            Err(ConfigError::TouchCountTooSmall(1))
        );
        assert!(config.apply(ConfigUpdate::TouchCount(2)).is_ok());
        assert_eq!(config.touch_count, 2);
    }

    #[test]
    fn test_touch_count_capped_by_window() {
        let mut config = TempoConfig::default();
        assert_eq!(
            config.apply(ConfigUpdate::TouchCount(5)),
            Err(ConfigError::InvalidValue {
                key: "TOUCH_COUNT",
                value: 5.0
            })
        );
        // Saturates to usize::MAX and must be rejected, not stored
        let huge = ConfigUpdate::parse("TOUCH_COUNT", 1e20).unwrap();
        assert!(config.apply(huge).is_err());
        assert_eq!(config.touch_count, 4);
        assert!(config.apply(ConfigUpdate::TouchCount(4)).is_ok());
    }

    #[test]
    fn test_validate_window_bounds() {
        let config = TempoConfig {
            touch_count: 6,
            window_size: 4,
            ..TempoConfig::default()
        };
        assert!(config.validate().is_err());
        let config = TempoConfig {
            window_size: MAX_WINDOW_SIZE + 1,
            ..TempoConfig::default()
        };
        assert!(config.validate().is_err());
        let config = TempoConfig {
            touch_count: 0,
            ..TempoConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TouchCountTooSmall(0)));
    }
}
