use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Mutex;

use dirsim_types::{OscValue, OutboundMessage};
use rosc::{OscMessage, OscPacket, OscType};

use super::DispatchError;

/// Where dispatched messages end up. Implementations must be callable from
/// the sender thread while the producer keeps enqueuing.
pub trait OscSink: Send + Sync {
    fn send(&self, msg: &OutboundMessage) -> Result<(), DispatchError>;

    /// Human-readable destination for logs.
    fn describe(&self) -> String;
}

fn to_osc_type(value: &OscValue) -> OscType {
    match value {
        OscValue::Int(v) => OscType::Int(*v),
        OscValue::Float(v) => OscType::Float(*v),
        OscValue::Str(v) => OscType::String(v.clone()),
    }
}

/// Encode a message as a single OSC packet.
pub fn encode_message(msg: &OutboundMessage) -> Result<Vec<u8>, DispatchError> {
    let packet = OscPacket::Message(OscMessage {
        addr: msg.address.clone(),
        args: msg.args.iter().map(to_osc_type).collect(),
    });
    rosc::encoder::encode(&packet).map_err(|e| DispatchError::Encode(e.to_string()))
}

/// Best-effort OSC over UDP.
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    pub fn connect(host: &str, port: u16) -> Result<Self, DispatchError> {
        let target = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DispatchError::Resolve(format!("{}:{}", host, port)))?;
        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl OscSink for UdpSink {
    fn send(&self, msg: &OutboundMessage) -> Result<(), DispatchError> {
        let buf = encode_message(msg)?;
        self.socket.send_to(&buf, self.target)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.target)
    }
}

/// Records every attempted message; can be told to fail each send.
#[derive(Default)]
pub struct MemorySink {
    attempted: Mutex<Vec<OutboundMessage>>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records each attempt and then reports it unreachable.
    pub fn failing() -> Self {
        Self {
            attempted: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn attempted(&self) -> Vec<OutboundMessage> {
        self.attempted
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.attempted()
            .into_iter()
            .map(|m| m.address)
            .collect()
    }
}

impl OscSink for MemorySink {
    fn send(&self, msg: &OutboundMessage) -> Result<(), DispatchError> {
        if let Ok(mut attempted) = self.attempted.lock() {
            attempted.push(msg.clone());
        }
        if self.failing {
            Err(DispatchError::Rejected("sink unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_roundtrips_through_rosc() {
        let msg = OutboundMessage::with_args(
            "/midi/1",
            vec![OscValue::Int(144), OscValue::Float(0.5), "x".into()],
        );
        let buf = encode_message(&msg).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf).unwrap();
        match packet {
            OscPacket::Message(decoded) => {
                assert_eq!(decoded.addr, "/midi/1");
                assert_eq!(
                    decoded.args,
                    vec![
                        OscType::Int(144),
                        OscType::Float(0.5),
                        OscType::String("x".to_string())
                    ]
                );
            }
            other => panic!("Expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_memory_sink_records_failures() {
        let sink = MemorySink::failing();
        assert!(sink.send(&OutboundMessage::tempo(120.0)).is_err());
        assert_eq!(sink.addresses(), vec!["/tempo/raw".to_string()]);
    }
}
