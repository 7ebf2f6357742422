#![allow(dead_code)]
//! Test harness utilities for dirsim-core integration tests.

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use dirsim_core::dispatch::{MemorySink, UdpSink};
use dirsim_core::{ControllerSettings, TempoController};
use rosc::{OscPacket, OscType};

pub const WAIT: Duration = Duration::from_secs(2);

/// A UDP socket on an ephemeral loopback port standing in for the OSC
/// receiver.
pub struct OscReceiver {
    socket: UdpSocket,
}

impl OscReceiver {
    pub fn bind() -> std::io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        socket.set_read_timeout(Some(WAIT))?;
        Ok(Self { socket })
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    pub fn sink(&self) -> UdpSink {
        UdpSink::connect("127.0.0.1", self.port()).unwrap()
    }

    /// Receive one OSC message, panicking on timeout or a bundle.
    pub fn recv(&self) -> (String, Vec<OscType>) {
        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = self.socket.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => (msg.addr, msg.args),
            other => panic!("Expected message, got {:?}", other),
        }
    }

    /// Receive `count` messages and return their addresses.
    pub fn recv_addresses(&self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.recv().0).collect()
    }
}

/// Controller wired to a recording sink with default settings.
pub fn recording_controller() -> (TempoController, Arc<MemorySink>) {
    recording_controller_with(ControllerSettings::default())
}

pub fn recording_controller_with(
    settings: ControllerSettings,
) -> (TempoController, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let controller = TempoController::new(settings, sink.clone()).unwrap();
    (controller, sink)
}

/// Integer tempo values recorded by `sink`, in send order.
pub fn tempo_sends(sink: &MemorySink) -> Vec<i32> {
    sink.attempted()
        .into_iter()
        .filter(|m| m.address == "/tempo/raw")
        .filter_map(|m| match m.args.first() {
            Some(dirsim_core::types::OscValue::Int(v)) => Some(*v),
            _ => None,
        })
        .collect()
}
