use std::collections::{BTreeMap, HashMap};
use std::fmt;

use dgen_wire::{ByteBuffer, ByteBufferMut, WireError};

use crate::{
    error::DgenError,
    resolver::{ResolvedField, ResolvedSchema, ResolvedType},
    types::ScalarKind,
};

/// A map key. Only integer and string keys exist on the wire, so keys order
/// the same way the generated `BTreeMap`s do.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Uint8(k)  => k.fmt(f),
            MapKey::Uint16(k) => k.fmt(f),
            MapKey::Uint32(k) => k.fmt(f),
            MapKey::Uint64(k) => k.fmt(f),
            MapKey::Int8(k)   => k.fmt(f),
            MapKey::Int16(k)  => k.fmt(f),
            MapKey::Int32(k)  => k.fmt(f),
            MapKey::Int64(k)  => k.fmt(f),
            MapKey::String(k) => f.write_str(k),
        }
    }
}

/// This type holds dynamic message data.
///
/// Values can represent anything in a schema and can be converted to and from
/// bytes using the corresponding `ResolvedSchema`, following exactly the rules
/// generated code follows. Enum and message names are borrowed from the
/// schema, so a `Value` can outlive the buffer it was decoded from but not the
/// schema.
///
/// A field missing from a `Message` is absent.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Enum(&'a str, &'a str),
    List(Vec<Value<'a>>),
    Map(BTreeMap<MapKey, Value<'a>>),
    Message(&'a str, HashMap<&'a str, Value<'a>>),
}

impl<'a> Value<'a> {
    /// Extracts the text out of a [String](#variant.String) or the variant
    /// name out of an [Enum](#variant.Enum). Returns `""` for other kinds.
    pub fn as_string(&self) -> &str {
        match self {
            Value::String(value) => value.as_str(),
            Value::Enum(_, variant) => variant,
            _ => "",
        }
    }

    /// Returns the elements of a [List](#variant.List), or an empty slice for
    /// other kinds.
    pub fn as_list(&self) -> &[Value<'a>] {
        match self {
            Value::List(values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Looks up a present field of a [Message](#variant.Message).
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        match self {
            Value::Message(_, fields) => fields.get(name),
            _ => None,
        }
    }

    /// Sets a field on a [Message](#variant.Message). Does nothing for other
    /// kinds.
    pub fn set(&mut self, name: &'a str, value: Value<'a>) {
        if let Value::Message(_, fields) = self {
            fields.insert(name, value);
        }
    }

    /// Whether this is the zero value of its type. Zero values are never
    /// written: they read back as absent.
    fn is_zero(&self, schema: &ResolvedSchema) -> bool {
        match self {
            Value::Uint8(v)   => *v == 0,
            Value::Uint16(v)  => *v == 0,
            Value::Uint32(v)  => *v == 0,
            Value::Uint64(v)  => *v == 0,
            Value::Int8(v)    => *v == 0,
            Value::Int16(v)   => *v == 0,
            Value::Int32(v)   => *v == 0,
            Value::Int64(v)   => *v == 0,
            Value::Float32(v) => *v == 0.0,
            Value::Float64(v) => *v == 0.0,
            Value::String(v)  => v.is_empty(),
            Value::List(v)    => v.is_empty(),
            Value::Map(v)     => v.is_empty(),
            Value::Enum(name, variant) => schema
                .enum_decl(name)
                .and_then(|decl| decl.variants.first())
                .map_or(false, |first| first == variant),
            Value::Message(..) => false,
        }
    }

    /// Decodes the message named `message` from `bytes`.
    pub fn decode(
        schema: &'a ResolvedSchema,
        message: &str,
        bytes: &[u8],
    ) -> Result<Value<'a>, DgenError> {
        Value::decode_message(schema, message, &mut ByteBuffer::new(bytes))
    }

    /// Encodes this value, which must be a [Message](#variant.Message).
    pub fn encode(&self, schema: &ResolvedSchema) -> Result<Vec<u8>, DgenError> {
        let mut bb = ByteBufferMut::new();
        self.encode_message(schema, &mut bb)?;
        Ok(bb.data())
    }

    /// Merge-join over the declared fields and the tags on the wire.
    fn decode_message(
        schema: &'a ResolvedSchema,
        name: &str,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, DgenError> {
        let message = schema
            .message(name)
            .ok_or_else(|| DgenError::UnknownMessage(name.to_string()))?;

        let mut fields = HashMap::new();
        let mut seq = bb.read_tag();
        let last = message.fields.len().saturating_sub(1);
        for (i, field) in message.fields.iter().enumerate() {
            if seq == Some(field.seq) {
                fields.insert(field.name.as_str(), Value::decode_type(schema, &field.ty, bb)?);
                if i != last {
                    seq = bb.read_tag();
                }
            } else if !field.optional {
                return Err(WireError::FieldNotFound(field.name.clone()).into());
            }
        }
        Ok(Value::Message(message.name.as_str(), fields))
    }

    fn decode_type(
        schema: &'a ResolvedSchema,
        ty: &ResolvedType,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, DgenError> {
        let value = match ty {
            ResolvedType::Scalar(kind) => match kind {
                ScalarKind::Uint8   => Value::Uint8(bb.read_uint8()?),
                ScalarKind::Uint16  => Value::Uint16(bb.read_uint16()?),
                ScalarKind::Uint32  => Value::Uint32(bb.read_uint32()?),
                ScalarKind::Uint64  => Value::Uint64(bb.read_uint64()?),
                ScalarKind::Int8    => Value::Int8(bb.read_int8()?),
                ScalarKind::Int16   => Value::Int16(bb.read_int16()?),
                ScalarKind::Int32   => Value::Int32(bb.read_int32()?),
                ScalarKind::Int64   => Value::Int64(bb.read_int64()?),
                ScalarKind::Float32 => Value::Float32(bb.read_float32()?),
                ScalarKind::Float64 => Value::Float64(bb.read_float64()?),
                ScalarKind::String  => Value::String(bb.read_string()?.to_string()),
            },

            ResolvedType::Enum(name) => {
                let decl = schema
                    .enum_decl(name)
                    .ok_or_else(|| DgenError::UnknownMessage(name.clone()))?;
                let value = bb.read_uint32()?;
                match decl.variants.get(value as usize) {
                    Some(variant) => Value::Enum(decl.name.as_str(), variant.as_str()),
                    None => {
                        return Err(WireError::InvalidEnumValue { name: name.clone(), value }.into())
                    }
                }
            }

            ResolvedType::List(elem) => {
                let len = bb.read_len()?;
                let mut values = Vec::with_capacity(len.min(bb.remaining().len()));
                for _ in 0..len {
                    values.push(Value::decode_type(schema, elem, bb)?);
                }
                Value::List(values)
            }

            ResolvedType::Map(key, elem) => {
                let len = bb.read_len()?;
                let mut values = BTreeMap::new();
                for _ in 0..len {
                    let k = Value::decode_key(*key, bb)?;
                    values.insert(k, Value::decode_type(schema, elem, bb)?);
                }
                Value::Map(values)
            }

            // No length prefix: decode from the rest of the buffer, then
            // re-encode to find out how much of it belonged to this message.
            ResolvedType::Message(name) => {
                let value = Value::decode_message(schema, name, &mut ByteBuffer::new(bb.remaining()))?;
                let consumed = value.encode(schema)?.len();
                bb.skip(consumed)?;
                value
            }
        };
        Ok(value)
    }

    fn decode_key(kind: ScalarKind, bb: &mut ByteBuffer) -> Result<MapKey, DgenError> {
        let key = match kind {
            ScalarKind::Uint8  => MapKey::Uint8(bb.read_uint8()?),
            ScalarKind::Uint16 => MapKey::Uint16(bb.read_uint16()?),
            ScalarKind::Uint32 => MapKey::Uint32(bb.read_uint32()?),
            ScalarKind::Uint64 => MapKey::Uint64(bb.read_uint64()?),
            ScalarKind::Int8   => MapKey::Int8(bb.read_int8()?),
            ScalarKind::Int16  => MapKey::Int16(bb.read_int16()?),
            ScalarKind::Int32  => MapKey::Int32(bb.read_int32()?),
            ScalarKind::Int64  => MapKey::Int64(bb.read_int64()?),
            ScalarKind::String => MapKey::String(bb.read_string()?.to_string()),
            ScalarKind::Float32 | ScalarKind::Float64 => {
                return Err(DgenError::EncodeError(format!("{} cannot be a map key", kind)))
            }
        };
        Ok(key)
    }

    fn encode_message(&self, schema: &ResolvedSchema, bb: &mut ByteBufferMut) -> Result<(), DgenError> {
        let (name, fields) = match self {
            Value::Message(name, fields) => (*name, fields),
            other => {
                return Err(DgenError::EncodeError(format!("expected a message but found {:?}", other)))
            }
        };
        let message = schema
            .message(name)
            .ok_or_else(|| DgenError::UnknownMessage(name.to_string()))?;

        for field in &message.fields {
            match fields.get(field.name.as_str()) {
                Some(value) if !value.is_zero(schema) => {
                    bb.write_tag(field.seq);
                    value.encode_type(schema, field, &field.ty, bb)?;
                }
                _ if !field.optional => {
                    return Err(WireError::MissingField(field.name.clone()).into());
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn encode_type(
        &self,
        schema: &ResolvedSchema,
        field: &ResolvedField,
        ty: &ResolvedType,
        bb: &mut ByteBufferMut,
    ) -> Result<(), DgenError> {
        match (ty, self) {
            (ResolvedType::Scalar(ScalarKind::Uint8), Value::Uint8(v))     => bb.write_uint8(*v),
            (ResolvedType::Scalar(ScalarKind::Uint16), Value::Uint16(v))   => bb.write_uint16(*v),
            (ResolvedType::Scalar(ScalarKind::Uint32), Value::Uint32(v))   => bb.write_uint32(*v),
            (ResolvedType::Scalar(ScalarKind::Uint64), Value::Uint64(v))   => bb.write_uint64(*v),
            (ResolvedType::Scalar(ScalarKind::Int8), Value::Int8(v))       => bb.write_int8(*v),
            (ResolvedType::Scalar(ScalarKind::Int16), Value::Int16(v))     => bb.write_int16(*v),
            (ResolvedType::Scalar(ScalarKind::Int32), Value::Int32(v))     => bb.write_int32(*v),
            (ResolvedType::Scalar(ScalarKind::Int64), Value::Int64(v))     => bb.write_int64(*v),
            (ResolvedType::Scalar(ScalarKind::Float32), Value::Float32(v)) => bb.write_float32(*v),
            (ResolvedType::Scalar(ScalarKind::Float64), Value::Float64(v)) => bb.write_float64(*v),
            (ResolvedType::Scalar(ScalarKind::String), Value::String(v))   => bb.write_string(v)?,

            (ResolvedType::Enum(name), Value::Enum(_, variant)) => {
                let index = schema
                    .enum_decl(name)
                    .and_then(|decl| decl.variants.iter().position(|v| v == variant))
                    .ok_or_else(|| {
                        DgenError::EncodeError(format!("{} has no variant {}", name, variant))
                    })?;
                bb.write_uint32(index as u32);
            }

            (ResolvedType::List(elem), Value::List(values)) => {
                bb.write_len(values.len())?;
                for value in values {
                    value.encode_type(schema, field, elem, bb)?;
                }
            }

            (ResolvedType::Map(key, elem), Value::Map(values)) => {
                bb.write_len(values.len())?;
                for (k, value) in values {
                    encode_key(*key, k, bb)?;
                    value.encode_type(schema, field, elem, bb)?;
                }
            }

            (ResolvedType::Message(_), Value::Message(..)) => self.encode_message(schema, bb)?,

            (ty, value) => {
                return Err(DgenError::EncodeError(format!(
                    "field {} expects {} but found {:?}",
                    field.name, ty, value
                )))
            }
        }
        Ok(())
    }

    /// Converts to JSON. Messages become objects holding their present
    /// fields, enums their variant name and map keys strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Uint8(v)   => (*v).into(),
            Value::Uint16(v)  => (*v).into(),
            Value::Uint32(v)  => (*v).into(),
            Value::Uint64(v)  => (*v).into(),
            Value::Int8(v)    => (*v).into(),
            Value::Int16(v)   => (*v).into(),
            Value::Int32(v)   => (*v).into(),
            Value::Int64(v)   => (*v).into(),
            Value::Float32(v) => (*v).into(),
            Value::Float64(v) => (*v).into(),
            Value::String(v)  => v.clone().into(),
            Value::Enum(_, variant) => (*variant).into(),
            Value::List(values) => values.iter().map(Value::to_json).collect(),
            Value::Map(values) => values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect::<serde_json::Map<_, _>>()
                .into(),
            Value::Message(_, fields) => fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect::<serde_json::Map<_, _>>()
                .into(),
        }
    }
}

fn encode_key(kind: ScalarKind, key: &MapKey, bb: &mut ByteBufferMut) -> Result<(), DgenError> {
    match (kind, key) {
        (ScalarKind::Uint8, MapKey::Uint8(k))   => bb.write_uint8(*k),
        (ScalarKind::Uint16, MapKey::Uint16(k)) => bb.write_uint16(*k),
        (ScalarKind::Uint32, MapKey::Uint32(k)) => bb.write_uint32(*k),
        (ScalarKind::Uint64, MapKey::Uint64(k)) => bb.write_uint64(*k),
        (ScalarKind::Int8, MapKey::Int8(k))     => bb.write_int8(*k),
        (ScalarKind::Int16, MapKey::Int16(k))   => bb.write_int16(*k),
        (ScalarKind::Int32, MapKey::Int32(k))   => bb.write_int32(*k),
        (ScalarKind::Int64, MapKey::Int64(k))   => bb.write_int64(*k),
        (ScalarKind::String, MapKey::String(k)) => bb.write_string(k)?,
        (kind, key) => {
            return Err(DgenError::EncodeError(format!("map key {:?} is not a {}", key, kind)))
        }
    }
    Ok(())
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Value::Uint8(value)   => value.fmt(f),
            Value::Uint16(value)  => value.fmt(f),
            Value::Uint32(value)  => value.fmt(f),
            Value::Uint64(value)  => value.fmt(f),
            Value::Int8(value)    => value.fmt(f),
            Value::Int16(value)   => value.fmt(f),
            Value::Int32(value)   => value.fmt(f),
            Value::Int64(value)   => value.fmt(f),
            Value::Float32(value) => value.fmt(f),
            Value::Float64(value) => value.fmt(f),
            Value::String(value)  => value.fmt(f),
            Value::Enum(name, variant) => write!(f, "{}::{}", name, variant),
            Value::List(values) => values.fmt(f),
            Value::Map(values) => f
                .debug_map()
                .entries(values.iter().map(|(k, v)| (k.to_string(), v)))
                .finish(),

            Value::Message(name, fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                let mut first = true;
                keys.sort();
                write!(f, "{} {{", name)?;

                for key in keys {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }

                write!(f, "}}")
            }
        }
    }
}
