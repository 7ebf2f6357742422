//! # dirsim-types
//!
//! Shared type definitions for the DirSim gesture-tempo controller.
//! Plain data only: zones, modes, tempo configuration and the outbound
//! messages handed to the dispatch queue. No I/O lives here.

pub mod config;
pub mod message;
mod zone;

pub use config::{ConfigError, ConfigUpdate, DecayTarget, TempoConfig, MAX_WINDOW_SIZE};
pub use message::{address, OscValue, OutboundMessage};
pub use zone::{Mode, Zone, DEFAULT_SEQUENCE};
