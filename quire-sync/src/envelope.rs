//! Session message envelope.
//!
//! Wire format (big-endian):
//! ```text
//! ┌─────────┬───────────┬──────────┬────────────┬──────────┐
//! │ version │ origin    │ tag      │ payload len│ payload  │
//! │ 1 byte  │ 16 bytes  │ 2 bytes  │ 4 bytes    │ variable │
//! └─────────┴───────────┴──────────┴────────────┴──────────┘
//! ```

use crate::codec::{CodecError, Decoder, Encoder};
use crate::memento::Memento;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed bytes in front of the payload.
pub const HEADER_LEN: usize = 1 + 16 + 2 + 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Unsupported protocol version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },
    #[error("Payload of {len} bytes exceeds the limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Identity of a sending process, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginId(Uuid);

impl OriginId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u8,
    pub origin: OriginId,
    pub tag: u16,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(origin: OriginId, tag: u16, payload: Vec<u8>) -> Self {
        Self { version: PROTOCOL_VERSION, origin, tag, payload }
    }

    /// Envelope carrying `memento` under its own tag.
    pub fn for_memento(origin: OriginId, memento: &Memento) -> Self {
        Self::new(origin, memento.action_type().tag(), memento.to_raw())
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(self.encoded_len());
        enc.put_u8(self.version)
            .put_raw(self.origin.as_bytes())
            .put_u16(self.tag)
            .put_bytes(&self.payload);
        enc.into_vec()
    }

    /// Decode and check an envelope. `max_payload` bounds the payload size.
    pub fn decode(bytes: &[u8], max_payload: usize) -> Result<Self, EnvelopeError> {
        let mut dec = Decoder::new(bytes);
        let version = dec.u8("version")?;
        if version != PROTOCOL_VERSION {
            return Err(EnvelopeError::UnsupportedVersion {
                found: version,
                expected: PROTOCOL_VERSION,
            });
        }
        let mut origin = [0u8; 16];
        origin.copy_from_slice(dec.raw("origin", 16)?);
        let tag = dec.u16("tag")?;
        let payload = dec.bytes("payload")?;
        if payload.len() > max_payload {
            return Err(EnvelopeError::PayloadTooLarge { len: payload.len(), max: max_payload });
        }
        let payload = payload.to_vec();
        dec.finish()?;
        Ok(Self { version, origin: OriginId::from_bytes(origin), tag, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_type::ActionType;
    use crate::memento::CharToggle;

    #[test]
    fn test_envelope_roundtrip() {
        let origin = OriginId::new_v4();
        let memento = Memento::Bold(CharToggle { begin: 3, end: 9, enabled: true });
        let envelope = Envelope::for_memento(origin, &memento);
        let bytes = envelope.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 9);

        let decoded = Envelope::decode(&bytes, 1024).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.tag, ActionType::FormatBold.tag());
        assert_eq!(Memento::from_raw(ActionType::FormatBold, &decoded.payload).unwrap(), memento);
    }

    #[test]
    fn test_header_layout() {
        let envelope = Envelope::new(OriginId::from_u128(42), 0x0102, vec![7]);
        let bytes = envelope.encode();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(&bytes[1..17], &42u128.to_be_bytes());
        assert_eq!(&bytes[17..19], &[1, 2]);
        assert_eq!(&bytes[19..23], &[0, 0, 0, 1]);
        assert_eq!(bytes[23], 7);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = Envelope::new(OriginId::new_v4(), 0, Vec::new()).encode();
        bytes[0] = 9;
        assert_eq!(
            Envelope::decode(&bytes, 1024),
            Err(EnvelopeError::UnsupportedVersion { found: 9, expected: PROTOCOL_VERSION })
        );
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let bytes = Envelope::new(OriginId::new_v4(), 0, vec![0; 32]).encode();
        assert!(matches!(
            Envelope::decode(&bytes, 16),
            Err(EnvelopeError::PayloadTooLarge { len: 32, max: 16 })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Envelope::new(OriginId::new_v4(), 0, Vec::new()).encode();
        bytes.push(0);
        assert!(matches!(Envelope::decode(&bytes, 1024), Err(EnvelopeError::Codec(_))));
    }
}
