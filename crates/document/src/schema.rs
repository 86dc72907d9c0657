//! Protobuf schema boundary
//!
//! The wire scanner never parses `.proto` files or descriptor sets. It asks a
//! [`SchemaLookup`] for the declared type of each field number it meets.
//! [`SchemaRegistry`] is a plain in-memory implementation that callers fill
//! from whatever descriptor source they have and pass around explicitly.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared Protobuf field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int64`
    Int64,
    /// `uint64`
    UInt64,
    /// `int32`
    Int32,
    /// `fixed64`
    Fixed64,
    /// `fixed32`
    Fixed32,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// Legacy group; never captured
    Group,
    /// Nested message
    Message,
    /// `bytes`
    Bytes,
    /// `uint32`
    UInt32,
    /// Enum, encoded as `int32`
    Enum,
    /// `sfixed32`
    SFixed32,
    /// `sfixed64`
    SFixed64,
    /// `sint32`, zigzag encoded
    SInt32,
    /// `sint64`, zigzag encoded
    SInt64,
}

impl ScalarKind {
    /// Wire type this kind is normally encoded with
    pub fn wire_type(&self) -> u8 {
        match self {
            ScalarKind::Int64
            | ScalarKind::UInt64
            | ScalarKind::Int32
            | ScalarKind::Bool
            | ScalarKind::UInt32
            | ScalarKind::Enum
            | ScalarKind::SInt32
            | ScalarKind::SInt64 => 0,
            ScalarKind::Double | ScalarKind::Fixed64 | ScalarKind::SFixed64 => 1,
            ScalarKind::String | ScalarKind::Bytes | ScalarKind::Message => 2,
            ScalarKind::Group => 3,
            ScalarKind::Float | ScalarKind::Fixed32 | ScalarKind::SFixed32 => 5,
        }
    }
}

/// Metadata for one field of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field number
    pub number: u32,
    /// Field name
    pub name: String,
    /// Declared type
    pub kind: ScalarKind,
    /// Message type name when `kind` is [`ScalarKind::Message`]
    pub message_type: Option<String>,
}

impl FieldDescriptor {
    /// A scalar field
    pub fn new(number: u32, name: impl Into<String>, kind: ScalarKind) -> Self {
        FieldDescriptor {
            number,
            name: name.into(),
            kind,
            message_type: None,
        }
    }

    /// A nested message field
    pub fn message(number: u32, name: impl Into<String>, message_type: impl Into<String>) -> Self {
        FieldDescriptor {
            number,
            name: name.into(),
            kind: ScalarKind::Message,
            message_type: Some(message_type.into()),
        }
    }
}

/// Field lookup by message type and field number
pub trait SchemaLookup: Send + Sync {
    /// Declared field `number` of `message`, if any
    fn field_by_number(&self, message: &str, number: u32) -> Option<&FieldDescriptor>;
}

/// A message's field table
#[derive(Debug, Clone, Default)]
pub struct MessageType {
    name: String,
    by_number: BTreeMap<u32, FieldDescriptor>,
    by_name: FxHashMap<String, u32>,
}

impl MessageType {
    /// Build a field table; later descriptors replace earlier ones with the same number
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let mut message = MessageType {
            name: name.into(),
            ..Default::default()
        };
        for field in fields {
            message.by_name.insert(field.name.clone(), field.number);
            message.by_number.insert(field.number, field);
        }
        message
    }

    /// Message type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field by number
    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number)
    }

    /// Field by name
    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).and_then(|n| self.by_number.get(n))
    }

    /// Fields in ascending number order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.by_number.values()
    }
}

/// In-memory collection of message types
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    messages: FxHashMap<String, MessageType>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a message type
    pub fn register(&mut self, message: MessageType) {
        self.messages.insert(message.name.clone(), message);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, message: MessageType) -> Self {
        self.register(message);
        self
    }

    /// Message type by name
    pub fn message(&self, name: &str) -> Option<&MessageType> {
        self.messages.get(name)
    }

    /// Resolve a dotted field-name path (`"address.zip"`) to field numbers
    pub fn resolve_path(&self, message: &str, path: &str) -> Option<Vec<u32>> {
        let mut current = self.message(message)?;
        let mut numbers = Vec::new();
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            let field = current.field_named(part)?;
            numbers.push(field.number);
            if parts.peek().is_some() {
                current = self.message(field.message_type.as_deref()?)?;
            }
        }
        Some(numbers)
    }
}

impl SchemaLookup for SchemaRegistry {
    fn field_by_number(&self, message: &str, number: u32) -> Option<&FieldDescriptor> {
        self.messages.get(message)?.field(number)
    }
}
