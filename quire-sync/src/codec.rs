//! Positional binary codec for action payloads.
//!
//! Fields are written back to back in declaration order, big-endian, with
//! no padding and no field tags:
//!
//! ```text
//! i32 / u32      4 bytes
//! u16            2 bytes
//! u8 / sub-kind  1 byte
//! bool           1 byte, 0 or 1
//! rgba           4 bytes, r g b a
//! string, bytes  u32 length + raw bytes (strings are UTF-8)
//! ```
//!
//! Decoding is strict: short input, invalid UTF-8, out-of-range enum values
//! and trailing bytes are all reported as [`CodecError::MalformedPayload`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use quire_core::{BlockStyle, Rgba};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed payload: field '{field}' at offset {offset}: {reason}")]
    MalformedPayload {
        field: &'static str,
        offset: usize,
        reason: String,
    },
}

impl CodecError {
    fn malformed(field: &'static str, offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedPayload { field, offset, reason: reason.into() }
    }
}

/// A value with a fixed positional wire layout.
pub trait WireFormat: Sized {
    fn encode(&self, enc: &mut Encoder);

    /// Read one value. `field` names it in error reports.
    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError>;
}

#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity) }
    }

    pub fn put<T: WireFormat>(&mut self, value: &T) -> &mut Self {
        value.encode(self);
        self
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.buf.put_u8(v as u8);
        self
    }

    pub fn put_bytes(&mut self, v: &[u8]) -> &mut Self {
        // Payloads are bounded well below u32::MAX by the envelope size limit.
        self.buf.put_u32(v.len() as u32);
        self.buf.put_slice(v);
        self
    }

    pub fn put_str(&mut self, v: &str) -> &mut Self {
        self.put_bytes(v.as_bytes())
    }

    pub fn put_raw(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_slice(v);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Cursor over an encoded payload.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, total: buf.len() }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.total - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn field<T: WireFormat>(&mut self, field: &'static str) -> Result<T, CodecError> {
        T::decode_field(self, field)
    }

    fn need(&self, field: &'static str, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::malformed(
                field,
                self.offset(),
                format!("need {} bytes, {} left", n, self.buf.remaining()),
            ));
        }
        Ok(())
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        self.need(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        self.need(field, 2)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        self.need(field, 4)?;
        Ok(self.buf.get_u32())
    }

    pub fn i32(&mut self, field: &'static str) -> Result<i32, CodecError> {
        self.need(field, 4)?;
        Ok(self.buf.get_i32())
    }

    pub fn bool(&mut self, field: &'static str) -> Result<bool, CodecError> {
        let offset = self.offset();
        match self.u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::malformed(
                field,
                offset,
                format!("invalid bool value {}", other),
            )),
        }
    }

    /// Fixed-size slice with no length prefix.
    pub fn raw(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], CodecError> {
        self.need(field, n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn bytes(&mut self, field: &'static str) -> Result<&'a [u8], CodecError> {
        let len = self.u32(field)? as usize;
        self.raw(field, len)
    }

    pub fn string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let offset = self.offset();
        let raw = self.bytes(field)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| CodecError::malformed(field, offset, format!("invalid UTF-8: {}", e)))
    }

    /// One-byte enumerated value, mapped through `from_u8`.
    pub fn sub_kind<T>(
        &mut self,
        field: &'static str,
        from_u8: impl FnOnce(u8) -> Option<T>,
    ) -> Result<T, CodecError> {
        let offset = self.offset();
        let raw = self.u8(field)?;
        from_u8(raw).ok_or_else(|| {
            CodecError::malformed(field, offset, format!("unknown value {}", raw))
        })
    }

    /// Fail if any input is left over.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.buf.has_remaining() {
            return Err(CodecError::malformed(
                "<end>",
                self.offset(),
                format!("{} trailing bytes", self.buf.remaining()),
            ));
        }
        Ok(())
    }
}

/// Encode a single value into a fresh buffer.
pub fn encode_to_vec<T: WireFormat>(value: &T) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.put(value);
    enc.into_vec()
}

/// Decode a value that must span the whole input.
pub fn decode_exact<T: WireFormat>(bytes: &[u8], field: &'static str) -> Result<T, CodecError> {
    let mut dec = Decoder::new(bytes);
    let value = T::decode_field(&mut dec, field)?;
    dec.finish()?;
    Ok(value)
}

impl WireFormat for u8 {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u8(*self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.u8(field)
    }
}

impl WireFormat for u16 {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u16(*self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.u16(field)
    }
}

impl WireFormat for u32 {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(*self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.u32(field)
    }
}

impl WireFormat for i32 {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(*self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.i32(field)
    }
}

impl WireFormat for bool {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_bool(*self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.bool(field)
    }
}

impl WireFormat for String {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_str(self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.string(field)
    }
}

impl WireFormat for Vec<u8> {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_bytes(self);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.bytes(field).map(<[u8]>::to_vec)
    }
}

impl WireFormat for Rgba {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_raw(&[self.r, self.g, self.b, self.a]);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        let raw = dec.raw(field, 4)?;
        Ok(Rgba::new(raw[0], raw[1], raw[2], raw[3]))
    }
}

impl WireFormat for BlockStyle {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u8(*self as u8);
    }

    fn decode_field(dec: &mut Decoder<'_>, field: &'static str) -> Result<Self, CodecError> {
        dec.sub_kind(field, BlockStyle::from_u8)
    }
}
