//! Outbound control-surface messages: an address plus a short argument list.

use std::fmt;

use serde::{Deserialize, Serialize};

/// OSC addresses understood by the control surface.
pub mod address {
    pub const TEMPO: &str = "/tempo/raw";
    pub const PLAY: &str = "/play";
    pub const STOP: &str = "/stop";
    pub const TIME: &str = "/time";

    /// `/track/<n>/volume`
    pub fn track_volume(track: u32) -> String {
        format!("/track/{}/volume", track)
    }

    /// `/midi/<channel>` (channel is 1-based)
    pub fn midi(channel: u8) -> String {
        format!("/midi/{}", channel)
    }
}

/// A single message argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OscValue {
    Int(i32),
    Float(f32),
    Str(String),
}

impl From<i32> for OscValue {
    fn from(v: i32) -> Self {
        OscValue::Int(v)
    }
}

impl From<f32> for OscValue {
    fn from(v: f32) -> Self {
        OscValue::Float(v)
    }
}

impl From<&str> for OscValue {
    fn from(v: &str) -> Self {
        OscValue::Str(v.to_string())
    }
}

impl fmt::Display for OscValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscValue::Int(v) => write!(f, "{}", v),
            OscValue::Float(v) => write!(f, "{:.3}", v),
            OscValue::Str(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// Created by the controller, consumed exactly once by the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub address: String,
    pub args: Vec<OscValue>,
}

impl OutboundMessage {
    pub fn new(address: impl Into<String>, value: impl Into<OscValue>) -> Self {
        Self {
            address: address.into(),
            args: vec![value.into()],
        }
    }

    pub fn with_args(address: impl Into<String>, args: Vec<OscValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// `/tempo/raw <bpm>` with the BPM rounded to the nearest integer.
    pub fn tempo(bpm: f64) -> Self {
        Self::new(address::TEMPO, bpm.round() as i32)
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
