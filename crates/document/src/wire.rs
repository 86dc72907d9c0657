//! Protobuf wire format primitives
//!
//! [`FieldReader`] walks a buffer one field at a time, borrowing
//! length-delimited payloads instead of copying them. [`MessageWriter`] is the
//! inverse, used to build buffers for tests and benchmarks.
//!
//! Wire types: `0` varint, `1` 64-bit little-endian, `2` length-delimited,
//! `5` 32-bit little-endian. Group markers (`3`, `4`) and the unassigned types
//! (`6`, `7`) are rejected.

use byteorder::{ByteOrder, LittleEndian};
use doctable_core::WireError;

/// Largest legal field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u64 = (1 << 29) - 1;

/// Maximum encoded length of a 64-bit varint
const MAX_VARINT_LEN: usize = 10;

/// Encode a varint, appending to `buf`
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from a byte slice, returning (value, bytes_consumed)
pub fn decode_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= ((byte & 0x7F) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Zigzag-decode a signed varint payload
#[inline]
pub fn decode_zigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Zigzag-encode a signed value
#[inline]
pub fn encode_zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// A field value as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue<'a> {
    /// Wire type 0
    Varint(u64),
    /// Wire type 1
    Fixed64(u64),
    /// Wire type 2, borrowed from the buffer
    Bytes(&'a [u8]),
    /// Wire type 5
    Fixed32(u32),
}

impl WireValue<'_> {
    /// Numeric wire type
    pub fn wire_type(&self) -> u8 {
        match self {
            WireValue::Varint(_) => 0,
            WireValue::Fixed64(_) => 1,
            WireValue::Bytes(_) => 2,
            WireValue::Fixed32(_) => 5,
        }
    }
}

/// One decoded field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireField<'a> {
    /// Field number from the tag
    pub number: u32,
    /// Offset of the tag within the buffer
    pub offset: usize,
    /// Payload
    pub value: WireValue<'a>,
}

/// Sequential field decoder over a borrowed buffer
///
/// Yields `Err` at most once; iteration ends after the first error.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Start reading at the beginning of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        FieldReader { buf, pos: 0 }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn varint(&mut self) -> Result<u64, WireError> {
        let start = self.pos;
        let (value, n) =
            decode_varint(self.remaining()).ok_or(WireError::BadVarint { offset: start })?;
        self.pos += n;
        Ok(value)
    }

    fn take(&mut self, wire_type: u8, needed: u64) -> Result<&'a [u8], WireError> {
        let rest = self.remaining();
        if needed > rest.len() as u64 {
            return Err(WireError::Truncated {
                wire_type,
                needed,
                remaining: rest.len(),
            });
        }
        let n = needed as usize;
        self.pos += n;
        Ok(&rest[..n])
    }

    fn read_field(&mut self) -> Result<WireField<'a>, WireError> {
        let offset = self.pos;
        let tag = self.varint()?;
        let wire_type = (tag & 7) as u8;
        let number = tag >> 3;
        if wire_type == 4 {
            return Err(WireError::GroupEnd { offset });
        }
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(WireError::IllegalFieldNumber { number });
        }
        let value = match wire_type {
            0 => WireValue::Varint(self.varint()?),
            1 => WireValue::Fixed64(LittleEndian::read_u64(self.take(1, 8)?)),
            2 => {
                let len = self.varint()?;
                WireValue::Bytes(self.take(2, len)?)
            }
            5 => WireValue::Fixed32(LittleEndian::read_u32(self.take(5, 4)?)),
            other => return Err(WireError::UnknownWireType(other)),
        };
        Ok(WireField {
            number: number as u32,
            offset,
            value,
        })
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<WireField<'a>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let field = self.read_field();
        if field.is_err() {
            self.pos = self.buf.len();
        }
        Some(field)
    }
}

/// Builder for Protobuf-encoded buffers
#[derive(Debug, Clone, Default)]
pub struct MessageWriter {
    buf: Vec<u8>,
}

impl MessageWriter {
    /// Empty message
    pub fn new() -> Self {
        Self::default()
    }

    fn tag(&mut self, number: u32, wire_type: u8) {
        encode_varint(((number as u64) << 3) | wire_type as u64, &mut self.buf);
    }

    /// Raw varint field (`int32`, `int64`, `uint*`, `bool`, `enum`)
    pub fn varint(mut self, number: u32, value: u64) -> Self {
        self.tag(number, 0);
        encode_varint(value, &mut self.buf);
        self
    }

    /// Signed integer in standard two's-complement varint form
    pub fn int(self, number: u32, value: i64) -> Self {
        self.varint(number, value as u64)
    }

    /// Zigzag varint field (`sint32`, `sint64`)
    pub fn sint(self, number: u32, value: i64) -> Self {
        self.varint(number, encode_zigzag(value))
    }

    /// 64-bit fixed field
    pub fn fixed64(mut self, number: u32, value: u64) -> Self {
        self.tag(number, 1);
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    /// 32-bit fixed field
    pub fn fixed32(mut self, number: u32, value: u32) -> Self {
        self.tag(number, 5);
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    /// `double` field
    pub fn double(self, number: u32, value: f64) -> Self {
        self.fixed64(number, value.to_bits())
    }

    /// `float` field
    pub fn float(self, number: u32, value: f32) -> Self {
        self.fixed32(number, value.to_bits())
    }

    /// Length-delimited field
    pub fn bytes(mut self, number: u32, value: &[u8]) -> Self {
        self.tag(number, 2);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
        self
    }

    /// `string` field
    pub fn string(self, number: u32, value: &str) -> Self {
        self.bytes(number, value.as_bytes())
    }

    /// Nested message field
    pub fn message(self, number: u32, nested: MessageWriter) -> Self {
        self.bytes(number, &nested.buf)
    }

    /// Encoded bytes
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
