//! TempoController: the single source of truth for the current tempo.
//!
//! Owns both estimators (only one is active at a time), the configuration,
//! the session-start flag and the dispatch queue. All methods run on the
//! producer thread and take an explicit timestamp in seconds.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use dirsim_types::{
    address, ConfigError, ConfigUpdate, Mode, OutboundMessage, TempoConfig, Zone,
};
use thiserror::Error;

use crate::dispatch::{
    DispatchError, DispatchQueue, OscSink, QueueProducer, DEFAULT_POLL_INTERVAL,
};
use crate::slider::{SliderController, SliderSettings};
use crate::tempo::{MotionEstimator, PatternEstimator};

/// Transport position sent with the start burst and on reset.
const ZERO_TIME: &str = "0:00.000";

/// Outbound cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    pub tempo_interval: Duration,
    pub slider_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            tempo_interval: Duration::from_secs(1),
            slider_interval: Duration::from_millis(100),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Everything the controller needs at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub tempo: TempoConfig,
    pub dispatch: DispatchSettings,
    pub sliders: SliderSettings,
    pub primary_track: u32,
    pub secondary_track: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tempo: TempoConfig::default(),
            dispatch: DispatchSettings::default(),
            sliders: SliderSettings::default(),
            primary_track: 5,
            secondary_track: 4,
        }
    }
}

/// Left-hand finger heights for the two volume sliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderReading {
    pub index_y: Option<f64>,
    pub pinky_y: Option<f64>,
    pub frame_height: f64,
}

/// Requests from other threads, applied on the producer thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    SetMode(Mode),
    ToggleMode,
    Reset,
    UpdateConfig(ConfigUpdate),
    Retarget { host: String, port: u16 },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

pub struct TempoController {
    config: TempoConfig,
    cadence: DispatchSettings,
    mode: Mode,
    motion: MotionEstimator,
    pattern: PatternEstimator,
    session_started: bool,
    /// Accepted touches toward the session-start cycle.
    cycle_progress: usize,
    primary: SliderController,
    secondary: SliderController,
    primary_address: String,
    secondary_address: String,
    last_tempo_send: Option<f64>,
    last_slider_send: Option<f64>,
    queue: DispatchQueue,
}

impl TempoController {
    /// Build a controller and start its sender thread.
    pub fn new(settings: ControllerSettings, sink: Arc<dyn OscSink>) -> std::io::Result<Self> {
        let queue = DispatchQueue::spawn(sink, settings.dispatch.poll_interval)?;
        Ok(Self::with_queue(settings, queue))
    }

    /// Build a controller around an existing queue. Invalid tempo settings
    /// are replaced by the defaults.
    pub fn with_queue(settings: ControllerSettings, queue: DispatchQueue) -> Self {
        let config = match settings.tempo.validate() {
            Ok(()) => settings.tempo,
            Err(e) => {
                log::warn!(target: "controller", "invalid tempo settings ({}), using defaults", e);
                TempoConfig::default()
            }
        };
        Self {
            motion: MotionEstimator::new(&config),
            pattern: PatternEstimator::new(&config),
            config,
            cadence: settings.dispatch,
            mode: Mode::Motion,
            session_started: false,
            cycle_progress: 0,
            primary: SliderController::new(settings.sliders),
            secondary: SliderController::new(settings.sliders),
            primary_address: address::track_volume(settings.primary_track),
            secondary_address: address::track_volume(settings.secondary_track),
            last_tempo_send: None,
            last_slider_send: None,
            queue,
        }
    }

    /// Feed the tracked hand position for this tick (`None` = no hand).
    pub fn observe_position(&mut self, position: Option<(f64, f64)>, now: f64) -> f64 {
        match self.mode {
            Mode::Motion => {
                self.motion.update(position, now);
                if position.is_some() {
                    self.start_session();
                }
            }
            Mode::Pattern => {
                log::trace!(target: "controller", "position ignored in pattern mode");
            }
        }
        self.tick(now);
        self.current_bpm()
    }

    /// Feed a detected zone touch. Returns whether the touch was accepted.
    pub fn observe_touch(&mut self, zone: Zone, now: f64) -> bool {
        if self.mode != Mode::Pattern {
            log::trace!(target: "controller", "{} touch ignored in motion mode", zone);
            self.tick(now);
            return false;
        }

        let accepted = self.pattern.add_touch(now, zone);
        if accepted {
            log::debug!(target: "controller", "touched {}, next {}", zone, self.pattern.get_next_expected());
            self.cycle_progress += 1;
            if self.cycle_progress >= self.pattern.sequence_len() {
                self.start_session();
            }
        }
        self.tick(now);
        accepted
    }

    /// Feed the slider fingers for this tick.
    pub fn observe_sliders(&mut self, reading: SliderReading, now: f64) {
        self.primary.update(reading.index_y, reading.frame_height);
        self.secondary.update(reading.pinky_y, reading.frame_height);
        if self.mode == Mode::Motion && (reading.index_y.is_some() || reading.pinky_y.is_some()) {
            self.start_session();
        }
        self.tick(now);
    }

    /// Emit rate-limited tempo and slider messages that are due.
    pub fn tick(&mut self, now: f64) {
        if due(self.last_tempo_send, now, self.cadence.tempo_interval) {
            let bpm = self.current_bpm();
            self.queue.push(OutboundMessage::tempo(bpm));
            self.last_tempo_send = Some(now);
            log::debug!(target: "controller", "tempo {:.0} BPM", bpm.round());
        }
        if due(self.last_slider_send, now, self.cadence.slider_interval) {
            let primary = OutboundMessage::new(self.primary_address.as_str(), self.primary.value());
            let secondary =
                OutboundMessage::new(self.secondary_address.as_str(), self.secondary.value());
            self.queue.push(primary);
            self.queue.push(secondary);
            self.last_slider_send = Some(now);
        }
    }

    fn start_session(&mut self) {
        if self.session_started {
            return;
        }
        self.queue.enqueue(address::STOP, 1);
        self.queue.enqueue(address::TIME, ZERO_TIME);
        self.queue.enqueue(address::PLAY, 1);
        self.session_started = true;
        log::info!(target: "controller", "session started ({} mode)", self.mode);
    }

    /// Swap the active estimator. Entering pattern mode starts a fresh
    /// pattern estimator seeded with the current tempo.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        if mode == Mode::Pattern {
            self.pattern = PatternEstimator::with_bpm(&self.config, self.current_bpm());
            self.cycle_progress = 0;
        }
        self.mode = mode;
        log::info!(target: "controller", "switched to {} mode at {:.1} BPM", mode, self.current_bpm());
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggled());
    }

    /// Stop the transport and return both estimators to `initial_bpm`.
    pub fn reset(&mut self) {
        let initial = self.config.initial_bpm;
        self.queue.enqueue(address::STOP, 1);
        self.queue.enqueue(address::TIME, ZERO_TIME);
        self.motion.reset_to(initial);
        self.pattern.reset_to(initial);
        self.queue.push(OutboundMessage::tempo(initial));
        self.session_started = false;
        self.cycle_progress = 0;
        log::info!(target: "controller", "reset to {} BPM", initial);
    }

    /// Validate and apply a configuration change to both estimators.
    /// Rejected changes are logged and leave all state untouched.
    pub fn update_config(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        match self.config.apply(update) {
            Ok(effective) => {
                for change in effective {
                    self.motion.set(change);
                    self.pattern.set(change);
                    log::info!(target: "controller", "config {} applied", change.key());
                }
                Ok(())
            }
            Err(e) => {
                log::warn!(target: "controller", "config {} rejected: {}", update.key(), e);
                Err(e)
            }
        }
    }

    /// String-keyed form of [`update_config`](Self::update_config), e.g.
    /// `("MAX_BPM", 120.0)`.
    pub fn update_config_key(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        let update = ConfigUpdate::parse(key, value).map_err(|e| {
            log::warn!(target: "controller", "config {} rejected: {}", key, e);
            e
        })?;
        self.update_config(update)
    }

    pub fn apply_command(&mut self, command: ControlCommand) -> Result<(), CommandError> {
        match command {
            ControlCommand::SetMode(mode) => self.set_mode(mode),
            ControlCommand::ToggleMode => self.toggle_mode(),
            ControlCommand::Reset => self.reset(),
            ControlCommand::UpdateConfig(update) => self.update_config(update)?,
            ControlCommand::Retarget { host, port } => self.queue.retarget(&host, port)?,
        }
        Ok(())
    }

    /// Apply every command waiting on `commands` without blocking. Failed
    /// commands are logged and skipped.
    pub fn apply_pending(&mut self, commands: &Receiver<ControlCommand>) -> usize {
        let mut applied = 0;
        while let Ok(command) = commands.try_recv() {
            log::debug!(target: "controller", "command {:?}", command);
            if let Err(e) = self.apply_command(command) {
                log::warn!(target: "controller", "command failed: {}", e);
                continue;
            }
            applied += 1;
        }
        applied
    }

    /// Tempo of the active estimator.
    pub fn current_bpm(&self) -> f64 {
        match self.mode {
            Mode::Motion => self.motion.current_bpm(),
            Mode::Pattern => self.pattern.get_bpm(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    pub fn session_started(&self) -> bool {
        self.session_started
    }

    /// Zone to touch next, in pattern mode.
    pub fn next_expected(&self) -> Option<Zone> {
        match self.mode {
            Mode::Pattern => Some(self.pattern.get_next_expected()),
            Mode::Motion => None,
        }
    }

    pub fn motion(&self) -> &MotionEstimator {
        &self.motion
    }

    pub fn pattern(&self) -> &PatternEstimator {
        &self.pattern
    }

    pub fn slider_values(&self) -> (f32, f32) {
        (self.primary.value(), self.secondary.value())
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn producer(&self) -> QueueProducer {
        self.queue.producer()
    }

    /// Stop enqueuing and drain the sender thread.
    pub fn shutdown(&mut self) {
        self.queue.shutdown();
    }
}

fn due(last: Option<f64>, now: f64, interval: Duration) -> bool {
    match last {
        None => true,
        Some(t) => now - t >= interval.as_secs_f64(),
    }
}
