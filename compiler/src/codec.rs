//! Wire codec generation.
//!
//! Every message gets a `Message` impl whose `marshal_into` writes set fields as
//! `tag byte + value` in declaration order and whose `unmarshal` walks the
//! declared fields in lockstep with the tags it reads (merge-join).
//!
//! Lists, maps and nested messages are encoded through shared free functions
//! (`marshal_<ident>` / `unmarshal_<ident>`). A `RoutineTable` remembers which
//! signatures already have a routine pair so each one is emitted exactly once
//! per generation run.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    resolver::{ResolvedField, ResolvedMessage, ResolvedType},
    types::ScalarKind,
    utils::{escape_rust_keyword, to_snake_case},
};

const RESULT: &str = "::std::result::Result";
const WIRE_ERROR: &str = "::dgen::wire::WireError";
const BTREE_MAP: &str = "::std::collections::BTreeMap";

pub(crate) fn scalar_rust_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Uint8   => "u8",
        ScalarKind::Uint16  => "u16",
        ScalarKind::Uint32  => "u32",
        ScalarKind::Uint64  => "u64",
        ScalarKind::Int8    => "i8",
        ScalarKind::Int16   => "i16",
        ScalarKind::Int32   => "i32",
        ScalarKind::Int64   => "i64",
        ScalarKind::Float32 => "f32",
        ScalarKind::Float64 => "f64",
        ScalarKind::String  => "::std::string::String",
    }
}

/// Rust identifier for a declared enum or message name.
pub(crate) fn type_ident(name: &str) -> String {
    escape_rust_keyword(name)
}

/// Rust identifier for a message field.
pub(crate) fn field_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// The Rust type of a value in element position. Container elements are
/// already heap-allocated, so nested messages are held by value there.
pub(crate) fn rust_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Scalar(kind)    => scalar_rust_type(*kind).to_string(),
        ResolvedType::Enum(name)      => type_ident(name),
        ResolvedType::Message(name)   => type_ident(name),
        ResolvedType::List(elem)      => format!("::std::vec::Vec<{}>", rust_type(elem)),
        ResolvedType::Map(key, value) => {
            format!("{}<{}, {}>", BTREE_MAP, scalar_rust_type(*key), rust_type(value))
        }
    }
}

/// The Rust type of a message field. A message-typed field is a by-reference
/// field: `None` is its unset value.
pub(crate) fn field_rust_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Message(name) => {
            format!("::std::option::Option<::std::boxed::Box<{}>>", type_ident(name))
        }
        other => rust_type(other),
    }
}

/// Name fragment for a routine pair: `list_int32`, `map_string_list_point`.
fn mangle(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Scalar(kind)    => kind.name().to_string(),
        ResolvedType::Enum(name)      => to_snake_case(name),
        ResolvedType::Message(name)   => to_snake_case(name),
        ResolvedType::List(elem)      => format!("list_{}", mangle(elem)),
        ResolvedType::Map(key, value) => format!("map_{}_{}", key.name(), mangle(value)),
    }
}

/// `&*v` is just `v`.
fn borrow(place: &str) -> String {
    match place.strip_prefix('*') {
        Some(inner) => inner.to_string(),
        None => format!("&{}", place),
    }
}

/// Memoization table for shared codec routines, keyed by canonical type
/// signature. Create one per generation run.
#[derive(Debug, Default)]
pub struct RoutineTable {
    idents: HashMap<String, String>,
    taken:  HashSet<String>,
    order:  Vec<String>,
    code:   String,
}

impl RoutineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of routine pairs emitted so far.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.idents.contains_key(signature)
    }

    /// Signatures in the order their routines were emitted.
    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The emitted routine source.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the identifier fragment of the routine pair for `ty`
    /// (a list, map or message), emitting the pair on first use.
    pub fn ensure(&mut self, ty: &ResolvedType) -> String {
        let signature = ty.signature();
        if let Some(ident) = self.idents.get(&signature) {
            return ident.clone();
        }

        let ident = self.fresh_ident(mangle(ty));
        // Registered before the body is generated so recursive types terminate.
        self.idents.insert(signature.clone(), ident.clone());
        debug!(signature = %signature, routine = %ident, "emitting codec routines");
        self.order.push(signature);

        let code = match ty {
            ResolvedType::List(elem)      => self.list_routines(&ident, elem),
            ResolvedType::Map(key, value) => self.map_routines(&ident, *key, value),
            ResolvedType::Message(name)   => message_routines(&ident, name),
            ResolvedType::Scalar(_) | ResolvedType::Enum(_) => String::new(),
        };
        self.code.push_str(&code);
        ident
    }

    fn fresh_ident(&mut self, base: String) -> String {
        let mut ident = base.clone();
        let mut n = 2;
        while self.taken.contains(&ident) {
            ident = format!("{}_{}", base, n);
            n += 1;
        }
        self.taken.insert(ident.clone());
        ident
    }

    /// A statement writing the value at `place` (a place expression of the
    /// value's type, e.g. `self.name` or `*v`) to `bb`.
    fn encode_place(&mut self, ty: &ResolvedType, place: &str) -> String {
        match ty {
            ResolvedType::Scalar(ScalarKind::String) => {
                format!("bb.write_string({})?;", borrow(place))
            }
            ResolvedType::Scalar(kind) => format!("bb.write_{}({});", kind.name(), place),
            ResolvedType::Enum(_) => format!("bb.write_uint32({} as u32);", place),
            ResolvedType::Message(_) | ResolvedType::List(_) | ResolvedType::Map(..) => {
                format!("marshal_{}({}, bb)?;", self.ensure(ty), borrow(place))
            }
        }
    }

    /// An expression reading one value of `ty` from `bb`.
    fn decode_expr(&mut self, ty: &ResolvedType) -> String {
        match ty {
            ResolvedType::Scalar(ScalarKind::String) => "bb.read_string()?.to_string()".to_string(),
            ResolvedType::Scalar(kind) => format!("bb.read_{}()?", kind.name()),
            ResolvedType::Enum(name) => format!(
                "<{} as ::std::convert::TryFrom<u32>>::try_from(bb.read_uint32()?)?",
                type_ident(name)
            ),
            ResolvedType::Message(_) | ResolvedType::List(_) | ResolvedType::Map(..) => {
                format!("unmarshal_{}(bb)?", self.ensure(ty))
            }
        }
    }

    fn list_routines(&mut self, ident: &str, elem: &ResolvedType) -> String {
        let elem_ty = rust_type(elem);
        let encode = self.encode_place(elem, "*v");
        let decode = self.decode_expr(elem);

        format!(
            r#"
fn marshal_{ident}(value: &[{elem_ty}], bb: &mut ::dgen::wire::ByteBufferMut) -> {RESULT}<(), {WIRE_ERROR}> {{
    bb.write_len(value.len())?;
    for v in value {{
        {encode}
    }}
    Ok(())
}}

fn unmarshal_{ident}(bb: &mut ::dgen::wire::ByteBuffer<'_>) -> {RESULT}<::std::vec::Vec<{elem_ty}>, {WIRE_ERROR}> {{
    let len = bb.read_len()?;
    let mut value = ::std::vec::Vec::with_capacity(len.min(bb.remaining().len()));
    for _ in 0..len {{
        value.push({decode});
    }}
    Ok(value)
}}
"#
        )
    }

    fn map_routines(&mut self, ident: &str, key: ScalarKind, value: &ResolvedType) -> String {
        let map_ty = format!("{}<{}, {}>", BTREE_MAP, scalar_rust_type(key), rust_type(value));
        let key_ty = ResolvedType::Scalar(key);
        let encode_key = self.encode_place(&key_ty, "*k");
        let encode_value = self.encode_place(value, "*v");
        let decode_key = self.decode_expr(&key_ty);
        let decode_value = self.decode_expr(value);

        format!(
            r#"
fn marshal_{ident}(value: &{map_ty}, bb: &mut ::dgen::wire::ByteBufferMut) -> {RESULT}<(), {WIRE_ERROR}> {{
    bb.write_len(value.len())?;
    for (k, v) in value {{
        {encode_key}
        {encode_value}
    }}
    Ok(())
}}

fn unmarshal_{ident}(bb: &mut ::dgen::wire::ByteBuffer<'_>) -> {RESULT}<{map_ty}, {WIRE_ERROR}> {{
    let len = bb.read_len()?;
    let mut value = {BTREE_MAP}::new();
    for _ in 0..len {{
        let k = {decode_key};
        let v = {decode_value};
        value.insert(k, v);
    }}
    Ok(value)
}}
"#
        )
    }
}

/// Nested messages have no length prefix. Encoding writes the fields straight
/// into the enclosing buffer. Decoding reads everything that is left, then
/// re-encodes the value to learn how many bytes it occupied, which only works
/// while encoding is deterministic and lossless.
fn message_routines(ident: &str, name: &str) -> String {
    let ty = type_ident(name);
    format!(
        r#"
fn marshal_{ident}(value: &{ty}, bb: &mut ::dgen::wire::ByteBufferMut) -> {RESULT}<(), {WIRE_ERROR}> {{
    ::dgen::wire::Message::marshal_into(value, bb)
}}

fn unmarshal_{ident}(bb: &mut ::dgen::wire::ByteBuffer<'_>) -> {RESULT}<{ty}, {WIRE_ERROR}> {{
    let value = <{ty} as ::dgen::wire::Message>::unmarshal(bb.remaining())?;
    let consumed = ::dgen::wire::Message::marshal(&value)?.len();
    bb.skip(consumed)?;
    Ok(value)
}}
"#
    )
}

/// The condition under which a field counts as set: its value differs from
/// the zero value of its type.
fn presence_check(field: &ResolvedField, place: &str) -> String {
    match &field.ty {
        ResolvedType::Scalar(ScalarKind::String)
        | ResolvedType::List(_)
        | ResolvedType::Map(..) => format!("!{}.is_empty()", place),
        ResolvedType::Scalar(kind) if kind.is_float() => format!("{} != 0.0", place),
        ResolvedType::Scalar(_) => format!("{} != 0", place),
        ResolvedType::Enum(_) => format!("({} as u32) != 0", place),
        ResolvedType::Message(_) => format!("let Some(value) = &{}", place),
    }
}

fn marshal_field(field: &ResolvedField, table: &mut RoutineTable) -> String {
    let place = format!("self.{}", field_ident(&field.name));
    let encode = match &field.ty {
        ResolvedType::Message(_) => format!("marshal_{}(value, bb)?;", table.ensure(&field.ty)),
        ty => table.encode_place(ty, &place),
    };

    let mut out = format!(
        "        if {} {{\n            bb.write_tag({});\n            {}\n        }}",
        presence_check(field, &place),
        field.seq,
        encode
    );
    if !field.optional {
        out.push_str(&format!(
            " else {{\n            return Err({}::MissingField({:?}.to_string()));\n        }}",
            WIRE_ERROR, field.name
        ));
    }
    out.push_str("\n\n");
    out
}

fn unmarshal_field(field: &ResolvedField, is_last: bool, table: &mut RoutineTable) -> String {
    let decode = match &field.ty {
        ResolvedType::Message(_) => format!(
            "Some(::std::boxed::Box::new(unmarshal_{}(bb)?))",
            table.ensure(&field.ty)
        ),
        ty => table.decode_expr(ty),
    };

    let mut out = format!(
        "        if seq == Some({}) {{\n            x.{} = {};\n",
        field.seq,
        field_ident(&field.name),
        decode
    );
    if !is_last {
        out.push_str("            seq = bb.read_tag();\n");
    }
    out.push_str("        }");
    if !field.optional {
        out.push_str(&format!(
            " else {{\n            return Err({}::FieldNotFound({:?}.to_string()));\n        }}",
            WIRE_ERROR, field.name
        ));
    }
    out.push_str("\n\n");
    out
}

/// `impl Message` for one message in binary mode. Shared routines it needs
/// are added to `table`.
pub fn binary_message_impl(message: &ResolvedMessage, table: &mut RoutineTable) -> String {
    let name = type_ident(&message.name);
    let mut out = format!("impl ::dgen::wire::Message for {} {{\n", name);

    if message.fields.is_empty() {
        out.push_str(&format!(
            "    fn marshal_into(&self, _bb: &mut ::dgen::wire::ByteBufferMut) -> {RESULT}<(), {WIRE_ERROR}> {{\n        Ok(())\n    }}\n\n"
        ));
        out.push_str(&format!(
            "    fn unmarshal(_data: &[u8]) -> {RESULT}<Self, {WIRE_ERROR}> {{\n        Ok(Self::default())\n    }}\n}}\n"
        ));
        return out;
    }

    out.push_str(&format!(
        "    fn marshal_into(&self, bb: &mut ::dgen::wire::ByteBufferMut) -> {RESULT}<(), {WIRE_ERROR}> {{\n"
    ));
    for field in &message.fields {
        out.push_str(&marshal_field(field, table));
    }
    out.push_str("        Ok(())\n    }\n\n");

    out.push_str(&format!(
        "    fn unmarshal(data: &[u8]) -> {RESULT}<Self, {WIRE_ERROR}> {{\n"
    ));
    out.push_str("        let bb = &mut ::dgen::wire::ByteBuffer::new(data);\n");
    out.push_str("        let mut x = Self::default();\n");
    let seq_binding = if message.fields.len() > 1 { "let mut seq" } else { "let seq" };
    out.push_str(&format!("        {} = bb.read_tag();\n\n", seq_binding));
    let last = message.fields.len() - 1;
    for (i, field) in message.fields.iter().enumerate() {
        out.push_str(&unmarshal_field(field, i == last, table));
    }
    out.push_str("        Ok(x)\n    }\n}\n");
    out
}

/// `impl Message` for one message in JSON mode: a pass-through to serde_json.
pub fn json_message_impl(message: &ResolvedMessage) -> String {
    format!(
        r#"impl ::dgen::wire::Message for {name} {{
    fn marshal_into(&self, bb: &mut ::dgen::wire::ByteBufferMut) -> {RESULT}<(), {WIRE_ERROR}> {{
        bb.write_bytes(&::dgen::serde_json::to_vec(self)?);
        Ok(())
    }}

    fn unmarshal(data: &[u8]) -> {RESULT}<Self, {WIRE_ERROR}> {{
        Ok(::dgen::serde_json::from_slice(data)?)
    }}
}}
"#,
        name = type_ident(&message.name)
    )
}
