//! MIDI input forwarded as OSC.
//!
//! Every 3-byte channel message becomes `/midi/<channel>` with the status
//! nibble and both data bytes as integer arguments. The translation is
//! always available; the port connection needs the `midi` feature.

use dirsim_types::{address, OscValue, OutboundMessage};

/// Translate a raw MIDI message. System messages (`0xF0..`) and anything
/// shorter than three bytes yield `None`.
pub fn midi_to_osc(message: &[u8]) -> Option<OutboundMessage> {
    if message.len() < 3 {
        return None;
    }
    let status = message[0];
    if status >= 0xF0 {
        return None;
    }
    let channel = (status & 0x0F) + 1;
    Some(OutboundMessage::with_args(
        address::midi(channel),
        vec![
            OscValue::Int(i32::from(status & 0xF0)),
            OscValue::Int(i32::from(message[1])),
            OscValue::Int(i32::from(message[2])),
        ],
    ))
}

#[cfg(feature = "midi")]
pub use bridge::{MidiBridge, MidiError};

#[cfg(feature = "midi")]
mod bridge {
    use midir::{MidiInput, MidiInputConnection};
    use thiserror::Error;

    use super::midi_to_osc;
    use crate::dispatch::QueueProducer;

    const CLIENT_NAME: &str = "dirsim";

    #[derive(Debug, Error)]
    pub enum MidiError {
        #[error("MIDI unavailable: {0}")]
        Init(String),
        #[error("invalid MIDI port index: {0}")]
        NoSuchPort(usize),
        #[error("could not connect to MIDI port: {0}")]
        Connect(String),
    }

    /// Live connection to one MIDI input port. Dropping it disconnects.
    pub struct MidiBridge {
        connection: Option<MidiInputConnection<()>>,
        port_name: String,
    }

    impl MidiBridge {
        /// Connect to the input port at `port_index` and forward each
        /// translated message to `producer`.
        pub fn connect(port_index: usize, producer: QueueProducer) -> Result<Self, MidiError> {
            let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
            let ports = midi_in.ports();
            let port = ports.get(port_index).ok_or(MidiError::NoSuchPort(port_index))?;
            let port_name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown".to_string());

            let connection = midi_in
                .connect(
                    port,
                    "dirsim-input",
                    move |_timestamp, message, _| match midi_to_osc(message) {
                        Some(msg) => producer.push(msg),
                        None => log::trace!(target: "midi", "ignored {:02X?}", message),
                    },
                    (),
                )
                .map_err(|e| MidiError::Connect(e.to_string()))?;

            log::info!(target: "midi", "forwarding MIDI from {}", port_name);
            Ok(Self {
                connection: Some(connection),
                port_name,
            })
        }

        pub fn port_name(&self) -> &str {
            &self.port_name
        }

        pub fn disconnect(&mut self) {
            if let Some(conn) = self.connection.take() {
                conn.close();
                log::info!(target: "midi", "disconnected from {}", self.port_name);
            }
        }
    }

    impl Drop for MidiBridge {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}
