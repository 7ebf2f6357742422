//! Hand-speed tempo estimation.
//!
//! Tracks the distance a hand travels between samples. Fast movement raises
//! the tempo along a compressive curve, a still hand lets it drift back, and
//! a band of small jittery speeds in between leaves it alone.

use std::collections::VecDeque;

use dirsim_types::{ConfigUpdate, DecayTarget, TempoConfig};

use super::{mean, push_bounded};

/// Instantaneous speeds kept for the moving average.
const SPEED_HISTORY: usize = 5;

/// Accepted BPM candidates averaged into the output.
const BPM_HISTORY: usize = 3;

/// Exponent applied to the speed ratio. Below 1 so moderate speeds cover
/// more of the BPM range and the top end is compressed.
const SPEED_CURVE: f64 = 0.75;

/// Consecutive absent samples (about one second of frames) before the loss
/// is reported.
const NO_SIGNAL_REPORT: u32 = 30;

#[derive(Debug, Clone)]
pub struct MotionEstimator {
    min_bpm: f64,
    max_bpm: f64,
    initial_bpm: f64,
    sensitivity: f64,
    still_threshold: f64,
    dead_zone: f64,
    decrease_rate: f64,
    decay_target: DecayTarget,
    current_bpm: f64,
    last_position: Option<(f64, f64)>,
    last_time: Option<f64>,
    last_update_time: Option<f64>,
    speeds: VecDeque<f64>,
    bpm_history: VecDeque<f64>,
    no_signal_count: u32,
    seeded: bool,
}

impl MotionEstimator {
    pub fn new(config: &TempoConfig) -> Self {
        Self {
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            initial_bpm: config.initial_bpm,
            sensitivity: config.sensitivity,
            still_threshold: config.still_threshold,
            dead_zone: config.dead_zone,
            decrease_rate: config.decrease_rate,
            decay_target: config.decay_target,
            current_bpm: config.initial_bpm,
            last_position: None,
            last_time: None,
            last_update_time: None,
            speeds: VecDeque::with_capacity(SPEED_HISTORY),
            bpm_history: VecDeque::with_capacity(BPM_HISTORY),
            no_signal_count: 0,
            seeded: false,
        }
    }

    /// Feed one tick. `position` is `None` when no hand was detected.
    pub fn update(&mut self, position: Option<(f64, f64)>, now: f64) -> f64 {
        let elapsed = self
            .last_update_time
            .map(|t| (now - t).max(0.0))
            .unwrap_or(0.0);

        match position {
            None => {
                self.no_signal_count = self.no_signal_count.saturating_add(1);
                if self.no_signal_count == NO_SIGNAL_REPORT {
                    log::debug!(target: "tempo::motion", "no hand for {} ticks, holding {:.2} BPM", self.no_signal_count, self.current_bpm);
                } else {
                    log::trace!(target: "tempo::motion", "no hand, holding {:.2} BPM", self.current_bpm);
                }
            }
            Some(pos) => {
                self.no_signal_count = 0;
                if let Some(last) = self.last_position {
                    let distance = (pos.0 - last.0).hypot(pos.1 - last.1);
                    let speed = if elapsed > 0.0 { distance / elapsed } else { 0.0 };
                    push_bounded(&mut self.speeds, speed, SPEED_HISTORY);
                    let avg_speed = mean(&self.speeds).unwrap_or(0.0);
                    self.apply_speed(avg_speed, elapsed);
                }
                self.last_position = Some(pos);
                self.last_time = Some(now);
            }
        }

        self.last_update_time = Some(now);
        self.current_bpm
    }

    fn apply_speed(&mut self, avg_speed: f64, elapsed: f64) {
        if avg_speed < self.still_threshold {
            self.decay(elapsed);
            log::trace!(target: "tempo::motion", "still (avg {:.1} px/s), BPM {:.2}", avg_speed, self.current_bpm);
        } else if avg_speed < self.dead_zone {
            log::trace!(target: "tempo::motion", "small movement (avg {:.1} px/s), BPM held at {:.2}", avg_speed, self.current_bpm);
        } else {
            let span = self.sensitivity - self.dead_zone;
            let ratio = if span > 0.0 {
                ((avg_speed - self.dead_zone) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let ratio = ratio.powf(SPEED_CURVE);
            let candidate = self.min_bpm + ratio * (self.max_bpm - self.min_bpm);
            push_bounded(&mut self.bpm_history, candidate, BPM_HISTORY);
            self.current_bpm = mean(&self.bpm_history).unwrap_or(candidate);
            self.seeded = true;
            log::debug!(target: "tempo::motion", "avg speed {:.1} px/s, ratio {:.2}, BPM {:.2}", avg_speed, ratio, self.current_bpm);
        }

        if self.seeded {
            self.current_bpm = self.current_bpm.max(self.min_bpm).min(self.max_bpm);
        }
    }

    /// Linear drift toward the decay target, never overshooting it.
    fn decay(&mut self, elapsed: f64) {
        let target = match self.decay_target {
            DecayTarget::Floor => self.min_bpm,
            DecayTarget::Resting => self.initial_bpm,
        };
        let diff = self.current_bpm - target;
        let step = self.decrease_rate * elapsed;
        if diff.abs() <= step {
            self.current_bpm = target;
        } else {
            self.current_bpm -= diff.signum() * step;
        }
    }

    /// Apply a configuration change. Histories are kept; the current tempo
    /// is pulled into a narrowed range right away.
    pub fn set(&mut self, update: ConfigUpdate) {
        match update {
            ConfigUpdate::MinBpm(v) => self.min_bpm = v,
            ConfigUpdate::MaxBpm(v) => self.max_bpm = v,
            ConfigUpdate::InitialBpm(v) => {
                self.initial_bpm = v;
                self.current_bpm = v;
            }
            ConfigUpdate::Sensitivity(v) => self.sensitivity = v,
            ConfigUpdate::TouchCount(_) => {}
        }
        if self.min_bpm <= self.max_bpm {
            self.current_bpm = self.current_bpm.clamp(self.min_bpm, self.max_bpm);
        }
    }

    /// Force the tempo and forget smoothing state (the controller's reset).
    pub fn reset_to(&mut self, bpm: f64) {
        self.current_bpm = bpm;
        self.speeds.clear();
        self.bpm_history.clear();
        self.seeded = false;
    }

    pub fn current_bpm(&self) -> f64 {
        self.current_bpm
    }

    /// Consecutive ticks without a detected hand.
    pub fn no_signal_count(&self) -> u32 {
        self.no_signal_count
    }

    /// Timestamp of the last position sample.
    pub fn last_sample_time(&self) -> Option<f64> {
        self.last_time
    }

    pub fn average_speed(&self) -> f64 {
        mean(&self.speeds).unwrap_or(0.0)
    }
}
