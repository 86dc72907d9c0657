//! Typed key extraction straight from Protobuf buffers
//!
//! [`WireScanner`] pairs a [`SchemaLookup`] with a message type and turns
//! selected fields of an encoded buffer into [`Key`]s without decoding the
//! whole message. A field is addressed by a path of field numbers; every
//! number but the last must name a nested message field.
//!
//! When a field occurs more than once, its first occurrence wins.

use crate::schema::{FieldDescriptor, ScalarKind, SchemaLookup};
use crate::wire::{decode_zigzag, FieldReader, WireValue};
use doctable_core::{Key, Result, WireError};
use tracing::debug;

/// Field extractor for one message type
#[derive(Clone, Copy)]
pub struct WireScanner<'s> {
    schema: &'s dyn SchemaLookup,
    message: &'s str,
}

impl<'s> WireScanner<'s> {
    /// Scanner for buffers holding a `message`
    pub fn new(schema: &'s dyn SchemaLookup, message: &'s str) -> Self {
        WireScanner { schema, message }
    }

    /// Visit every declared top-level field in buffer order
    ///
    /// `visit` receives the field number and its converted key (`None` when
    /// the declared type cannot be represented as a key). Returning `false`
    /// stops the scan. Undeclared fields are skipped without a callback.
    pub fn for_each_field<F>(&self, buf: &[u8], mut visit: F) -> Result<()>
    where
        F: FnMut(u32, Option<Key>) -> bool,
    {
        self.scan(buf, |field, value| {
            let key = convert(field, value)?;
            Ok(visit(field.number, key))
        })
    }

    /// Key for the first occurrence of the field at `path`
    ///
    /// Returns `Ok(None)` when the field is absent, undeclared, or of a type
    /// that does not yield keys.
    pub fn get(&self, buf: &[u8], path: &[u32]) -> Result<Option<Key>> {
        let Some((&target, rest)) = path.split_first() else {
            return Ok(None);
        };
        let mut found = None;
        self.scan(buf, |field, value| {
            if field.number != target {
                return Ok(true);
            }
            found = self.resolve(field, value, rest)?;
            Ok(false)
        })?;
        Ok(found)
    }

    /// Keys for several fields, in request order
    ///
    /// When the requested paths are strictly ascending by their first field
    /// number the buffer is walked once, matching requested fields in lockstep
    /// with the buffer. If the buffer turns out not to be in ascending field
    /// order, every field not yet captured is re-read with [`get`](Self::get).
    /// Requests that are not ascending go straight to per-field scans.
    pub fn keys_of(&self, buf: &[u8], paths: &[&[u32]]) -> Result<Vec<Option<Key>>> {
        if paths.iter().any(|p| p.is_empty()) || !is_ascending(paths) {
            return paths.iter().map(|p| self.get(buf, p)).collect();
        }

        let mut keys: Vec<Option<Key>> = vec![None; paths.len()];
        let mut captured = vec![false; paths.len()];
        let mut remaining = paths.len();
        let mut cursor = 0usize;
        let mut prev = 0u32;
        let mut out_of_order = false;

        self.scan(buf, |field, value| {
            if field.number < prev {
                out_of_order = true;
                return Ok(false);
            }
            prev = field.number;

            while cursor < paths.len() && paths[cursor][0] < field.number {
                cursor += 1;
            }
            if cursor < paths.len() && paths[cursor][0] == field.number && !captured[cursor] {
                keys[cursor] = self.resolve(field, value, &paths[cursor][1..])?;
                captured[cursor] = true;
                remaining -= 1;
                if remaining == 0 {
                    return Ok(false);
                }
            }
            Ok(true)
        })?;

        if out_of_order {
            debug!(
                target: "doctable::wire",
                message_type = self.message,
                pending = remaining,
                "field order not ascending, rescanning remaining fields"
            );
            for (i, path) in paths.iter().enumerate() {
                if !captured[i] {
                    keys[i] = self.get(buf, path)?;
                }
            }
        }
        Ok(keys)
    }

    /// Walk declared fields, stopping when `visit` returns `false`
    fn scan<F>(&self, buf: &[u8], mut visit: F) -> Result<()>
    where
        F: FnMut(&FieldDescriptor, WireValue<'_>) -> Result<bool>,
    {
        for field in FieldReader::new(buf) {
            let field = field?;
            let Some(descriptor) = self.schema.field_by_number(self.message, field.number) else {
                continue;
            };
            if !visit(descriptor, field.value)? {
                break;
            }
        }
        Ok(())
    }

    /// Key for `value`, descending into nested messages while `rest` is non-empty
    fn resolve(
        &self,
        field: &FieldDescriptor,
        value: WireValue<'_>,
        rest: &[u32],
    ) -> Result<Option<Key>> {
        if rest.is_empty() {
            return convert(field, value);
        }
        match (field.kind, value, field.message_type.as_deref()) {
            (ScalarKind::Message, WireValue::Bytes(inner), Some(nested)) => {
                WireScanner::new(self.schema, nested).get(inner, rest)
            }
            _ => Ok(None),
        }
    }
}

fn is_ascending(paths: &[&[u32]]) -> bool {
    paths.windows(2).all(|w| w[0][0] < w[1][0])
}

/// Convert a wire value to a key according to its declared type
///
/// A declared type that cannot have produced the observed wire type yields
/// `None`. Message fields convert to `Nil`; strings must be valid UTF-8.
pub fn convert(field: &FieldDescriptor, value: WireValue<'_>) -> Result<Option<Key>> {
    use ScalarKind as K;
    let key = match value {
        WireValue::Varint(raw) => match field.kind {
            K::Bool => Key::Bool(raw != 0),
            K::Int32 | K::Enum => Key::Int(raw as i32 as i64),
            K::Int64 => Key::Int(raw as i64),
            K::UInt32 => Key::Int(raw as u32 as i64),
            K::UInt64 => unsigned(raw),
            K::SInt32 => Key::Int(decode_zigzag(raw) as i32 as i64),
            K::SInt64 | K::SFixed32 | K::SFixed64 => Key::Int(decode_zigzag(raw)),
            _ => return Ok(None),
        },
        WireValue::Fixed64(bits) => match field.kind {
            K::Double => Key::Float(f64::from_bits(bits)),
            K::Fixed64 => unsigned(bits),
            K::SFixed64 => Key::Int(bits as i64),
            _ => return Ok(None),
        },
        WireValue::Fixed32(bits) => match field.kind {
            K::Float => Key::Float(f32::from_bits(bits) as f64),
            K::Fixed32 => Key::Int(bits as i64),
            K::SFixed32 => Key::Int(bits as i32 as i64),
            _ => return Ok(None),
        },
        WireValue::Bytes(bytes) => match field.kind {
            K::String => match std::str::from_utf8(bytes) {
                Ok(s) => Key::String(s.to_string()),
                Err(_) => {
                    return Err(WireError::InvalidUtf8 {
                        field: field.number,
                    }
                    .into())
                }
            },
            K::Bytes => Key::String(String::from_utf8_lossy(bytes).into_owned()),
            K::Message => Key::Nil,
            _ => return Ok(None),
        },
    };
    Ok(Some(key))
}

fn unsigned(raw: u64) -> Key {
    match i64::try_from(raw) {
        Ok(v) => Key::Int(v),
        Err(_) => Key::Float(raw as f64),
    }
}
