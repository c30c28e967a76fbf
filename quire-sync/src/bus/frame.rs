//! Frames exchanged between bus clients and the bus daemon.
//!
//! Serialized with bincode. A client registers an endpoint path first; after
//! `Registered` it may publish `Signal` frames, which the daemon relays
//! unchanged to every endpoint registered on the same path.

use crate::envelope::OriginId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameKind {
    /// Client asks to receive signals on `path`
    Register = 1,
    /// Registration accepted
    Registered = 2,
    /// Registration refused; body holds the reason
    Rejected = 3,
    /// Opaque message for every endpoint on `path`
    Signal = 4,
    Ping = 5,
    Pong = 6,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusFrame {
    pub kind: FrameKind,
    pub path: String,
    pub origin: OriginId,
    pub body: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl BusFrame {
    pub fn register(origin: OriginId, path: impl Into<String>) -> Self {
        Self { kind: FrameKind::Register, path: path.into(), origin, body: Vec::new() }
    }

    pub fn registered(origin: OriginId, path: impl Into<String>) -> Self {
        Self { kind: FrameKind::Registered, path: path.into(), origin, body: Vec::new() }
    }

    pub fn rejected(origin: OriginId, path: impl Into<String>, reason: &str) -> Self {
        Self {
            kind: FrameKind::Rejected,
            path: path.into(),
            origin,
            body: reason.as_bytes().to_vec(),
        }
    }

    pub fn signal(origin: OriginId, path: impl Into<String>, body: Vec<u8>) -> Self {
        Self { kind: FrameKind::Signal, path: path.into(), origin, body }
    }

    pub fn ping(origin: OriginId) -> Self {
        Self { kind: FrameKind::Ping, path: String::new(), origin, body: Vec::new() }
    }

    pub fn pong(origin: OriginId) -> Self {
        Self { kind: FrameKind::Pong, path: String::new(), origin, body: Vec::new() }
    }

    /// Rejection reason carried by a `Rejected` frame.
    pub fn reason(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| FrameError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (frame, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| FrameError::Deserialization(e.to_string()))?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_roundtrip() {
        let origin = OriginId::new_v4();
        let frame = BusFrame::signal(origin, "/sessions/common", vec![1, 2, 3]);
        let decoded = BusFrame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_rejected_carries_reason() {
        let frame = BusFrame::rejected(OriginId::from_u128(1), "/sessions/x", "taken");
        let decoded = BusFrame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded.kind, FrameKind::Rejected);
        assert_eq!(decoded.reason(), "taken");
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(matches!(
            BusFrame::decode(&[0xff, 0xff]),
            Err(FrameError::Deserialization(_))
        ));
    }
}
