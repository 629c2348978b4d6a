//! dgen-compiler
//!
//! This crate implements:
//!  1) A tokenizer + recursive-descent parser for `.dg` IDL files,
//!  2) A resolver that classifies every field type (scalar, enum, message,
//!     list, map) and rejects undeclared or duplicate names,
//!  3) Code generation for the tag-aligned binary wire format (or a JSON
//!     pass-through) plus service stubs (`compile_schema_to_rust`),
//!  4) `generate`, which reads a schema file and writes the generated sources,
//!  5) A dynamic `Value` codec for inspecting encoded messages without
//!     generated code,
//!  6) Error types (`DgenError`) and the `Backend` trait.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod resolver;
pub mod codec;
pub mod service;
pub mod compiler;
pub mod gen_rust;
pub mod traits;
pub mod value;

pub use compiler::{compile_schema, generate, generate_source, parse_source, EncodeMode, GenerateConfig};
pub use error::DgenError;
pub use gen_rust::{compile_schema_to_rust, RustBackend};
pub use resolver::ResolvedSchema;
pub use traits::{Backend, GeneratedFile};
pub use value::Value;
