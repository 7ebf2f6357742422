//! # dirsim-core
//!
//! Gesture-to-tempo engine. Turns hand positions or zone touches into a BPM
//! and streams it, with transport and volume messages, to an OSC receiver.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dirsim_core::config::Config;
//! use dirsim_core::dispatch::UdpSink;
//! use dirsim_core::TempoController;
//!
//! let config = Config::load();
//! let (host, port) = config.osc_target();
//! let sink = Arc::new(UdpSink::connect(&host, port)?);
//! let mut controller = TempoController::new(config.controller_settings(), sink)?;
//!
//! // Once per camera frame, with a monotonic timestamp in seconds
//! controller.observe_position(Some((320.0, 240.0)), now);
//! ```
//!
//! ## Module Overview
//!
//! - [`tempo`]: `MotionEstimator` (hand speed) and `PatternEstimator`
//!   (cyclic zone touches)
//! - [`controller`]: `TempoController`, the owner of mode, session state and
//!   rate-limited output
//! - [`dispatch`]: ordered outbound queue with a dedicated sender thread and
//!   the `OscSink` seam
//! - [`slider`]: finger height to volume
//! - [`midi`]: MIDI to OSC forwarding
//! - [`config`]: TOML configuration (embedded defaults plus user overrides)

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod midi;
pub mod slider;
pub mod tempo;

pub use controller::{
    CommandError, ControlCommand, ControllerSettings, DispatchSettings, SliderReading,
    TempoController,
};
pub use dispatch::{DispatchError, DispatchQueue, OscSink, QueueProducer, UdpSink};
pub use dirsim_types as types;
