use std::fmt;

use serde::{Serialize, Serializer};

/// The builtin types a field, list element, map key or map value can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 11] = [
        ScalarKind::Uint8,
        ScalarKind::Uint16,
        ScalarKind::Uint32,
        ScalarKind::Uint64,
        ScalarKind::Int8,
        ScalarKind::Int16,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Float32,
        ScalarKind::Float64,
        ScalarKind::String,
    ];

    pub fn from_name(name: &str) -> Option<ScalarKind> {
        ScalarKind::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Uint8   => "uint8",
            ScalarKind::Uint16  => "uint16",
            ScalarKind::Uint32  => "uint32",
            ScalarKind::Uint64  => "uint64",
            ScalarKind::Int8    => "int8",
            ScalarKind::Int16   => "int16",
            ScalarKind::Int32   => "int32",
            ScalarKind::Int64   => "int64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
            ScalarKind::String  => "string",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    /// Integer kinds and `string` have a total order, so they can key a map.
    pub fn is_valid_map_key(self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field type as written in the schema. `Named` is resolved later, once
/// every declaration is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Scalar(ScalarKind),
    Named(String),
    List(Box<TypeExpr>),
    Map(ScalarKind, Box<TypeExpr>),
}

/// Canonical signature: `int32`, `Point`, `list[int32]`, `map[string]list[Point]`.
impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Scalar(kind)     => write!(f, "{}", kind),
            TypeExpr::Named(name)      => f.write_str(name),
            TypeExpr::List(elem)       => write!(f, "list[{}]", elem),
            TypeExpr::Map(key, value)  => write!(f, "map[{}]{}", key, value),
        }
    }
}

impl Serialize for TypeExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub seq:      u8,
    pub optional: bool,
    #[serde(rename = "type")]
    pub ty:       TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDecl {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub request:  String,
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDecl {
    pub name:    String,
    pub line:    usize,
    pub column:  usize,
    pub methods: Vec<Method>,
}

/// Everything declared in one schema file, in declaration order.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Schema {
    pub enums:    Vec<EnumDecl>,
    pub messages: Vec<MessageDecl>,
    pub services: Vec<ServiceDecl>,
}
