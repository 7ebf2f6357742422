//! Outbound dispatch: an ordered queue drained by a dedicated sender thread.
//!
//! The tick-driven producer enqueues messages without blocking on the
//! network. The sender pops one message at a time and hands it to the
//! current [`OscSink`], so at most one send is in flight and delivery order
//! matches enqueue order.

mod queue;
mod sink;

pub use queue::{DispatchQueue, QueueProducer, DEFAULT_POLL_INTERVAL};
pub use sink::{encode_message, MemorySink, OscSink, UdpSink};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to encode OSC message: {0}")]
    Encode(String),
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("sink rejected message: {0}")]
    Rejected(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
