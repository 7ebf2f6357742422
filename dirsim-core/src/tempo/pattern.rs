//! Tempo from a cyclic sequence of zone touches.
//!
//! Only the zone expected next in the cycle is accepted. The BPM is the
//! inverse of the average interval across the most recent `touch_count`
//! accepted touches; results outside `[min_bpm, max_bpm]` are discarded in
//! favor of the last valid value.

use std::collections::VecDeque;

use dirsim_types::{ConfigUpdate, TempoConfig, Zone};

use super::push_bounded;

#[derive(Debug, Clone)]
pub struct PatternEstimator {
    min_bpm: f64,
    max_bpm: f64,
    sequence: [Zone; 4],
    index: usize,
    touch_count: usize,
    window_size: usize,
    batched: bool,
    touch_times: VecDeque<f64>,
    /// Accepted touches since the window was last cleared.
    accepted: u64,
    recomputations: u64,
    current_bpm: f64,
    last_valid_bpm: f64,
}

impl PatternEstimator {
    pub fn new(config: &TempoConfig) -> Self {
        Self::with_bpm(config, config.initial_bpm)
    }

    /// Start from an existing tempo (used when switching into pattern mode).
    pub fn with_bpm(config: &TempoConfig, bpm: f64) -> Self {
        Self {
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            sequence: config.sequence,
            index: 0,
            touch_count: config.touch_count,
            window_size: config.window_size,
            batched: config.batched,
            touch_times: VecDeque::new(),
            accepted: 0,
            recomputations: 0,
            current_bpm: bpm,
            last_valid_bpm: bpm,
        }
    }

    /// Register a touch. Returns `false` (and changes nothing) when `zone`
    /// is not the one expected next.
    pub fn add_touch(&mut self, timestamp: f64, zone: Zone) -> bool {
        let expected = self.sequence[self.index];
        if zone != expected {
            log::debug!(target: "tempo::pattern", "ignored {} touch, expecting {}", zone, expected);
            return false;
        }

        push_bounded(&mut self.touch_times, timestamp, self.window_size);
        self.index = (self.index + 1) % self.sequence.len();
        self.accepted += 1;

        if self.should_recompute() {
            self.recompute();
        }
        true
    }

    /// The first touch after the window is (re)started always recomputes so
    /// a new cadence takes effect immediately; after that, batched mode
    /// waits for every `touch_count`-th touch.
    fn should_recompute(&self) -> bool {
        !self.batched || self.accepted == 1 || self.accepted % self.touch_count.max(1) as u64 == 0
    }

    fn recompute(&mut self) {
        self.recomputations += 1;

        let n = self.touch_count.min(self.touch_times.len());
        if n < 2 {
            self.current_bpm = self.last_valid_bpm;
            return;
        }

        let skip = self.touch_times.len() - n;
        let first = self.touch_times[skip];
        let last = self.touch_times[self.touch_times.len() - 1];
        let avg_interval = (last - first) / (n - 1) as f64;
        if avg_interval <= 0.0 {
            self.current_bpm = self.last_valid_bpm;
            return;
        }

        let bpm = 60.0 / avg_interval;
        if bpm >= self.min_bpm && bpm <= self.max_bpm {
            self.current_bpm = bpm;
            self.last_valid_bpm = bpm;
            log::debug!(target: "tempo::pattern", "{} touches, interval {:.3}s, BPM {:.2}", n, avg_interval, bpm);
        } else {
            self.current_bpm = self.last_valid_bpm;
            log::debug!(target: "tempo::pattern", "BPM {:.2} outside [{}, {}], keeping {:.2}", bpm, self.min_bpm, self.max_bpm, self.last_valid_bpm);
        }
    }

    /// Apply a configuration change. A new `touch_count` clears the window.
    pub fn set(&mut self, update: ConfigUpdate) {
        match update {
            ConfigUpdate::MinBpm(v) => self.min_bpm = v,
            ConfigUpdate::MaxBpm(v) => self.max_bpm = v,
            ConfigUpdate::InitialBpm(v) => {
                self.current_bpm = v;
                self.last_valid_bpm = v;
            }
            ConfigUpdate::Sensitivity(_) => {}
            ConfigUpdate::TouchCount(n) => {
                self.touch_count = n;
                self.clear_window();
            }
        }
        if self.min_bpm <= self.max_bpm {
            self.current_bpm = self.current_bpm.clamp(self.min_bpm, self.max_bpm);
            self.last_valid_bpm = self.last_valid_bpm.clamp(self.min_bpm, self.max_bpm);
        }
    }

    /// Force the tempo and restart the cycle from its first zone.
    pub fn reset_to(&mut self, bpm: f64) {
        self.current_bpm = bpm;
        self.last_valid_bpm = bpm;
        self.index = 0;
        self.clear_window();
    }

    fn clear_window(&mut self) {
        self.touch_times.clear();
        self.accepted = 0;
    }

    pub fn get_bpm(&self) -> f64 {
        self.current_bpm
    }

    pub fn last_valid_bpm(&self) -> f64 {
        self.last_valid_bpm
    }

    pub fn get_next_expected(&self) -> Zone {
        self.sequence[self.index]
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    pub fn touches_in_window(&self) -> usize {
        self.touch_times.len()
    }

    /// How many times the BPM has been recomputed (diagnostics).
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
