use std::path::PathBuf;

use tracing::debug;

use crate::{
    codec::{binary_message_impl, field_ident, field_rust_type, json_message_impl, type_ident, RoutineTable},
    compiler::EncodeMode,
    error::DgenError,
    resolver::{ResolvedMessage, ResolvedSchema},
    service::compile_services_to_rust,
    traits::{Backend, GeneratedFile},
    types::EnumDecl,
};

/// The two generated Rust sources: data types with their codecs, and
/// service stubs. Neither contains `use` items, so both can be
/// `include!`d into the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustOutput {
    pub types:    String,
    pub services: String,
}

const SERDE_DERIVES: &str = "::dgen::serde::Serialize, ::dgen::serde::Deserialize";
const SERDE_CRATE: &str = "#[serde(crate = \"::dgen::serde\")]";

pub(crate) fn header(source_name: &str) -> String {
    format!("// Code generated by dgen from {}. DO NOT EDIT.\n", source_name)
}

/// Compiles a resolved schema into Rust source. Every call starts a fresh
/// routine table, so shared routines are emitted once per output.
pub fn compile_schema_to_rust(
    schema: &ResolvedSchema,
    encoding: EncodeMode,
    source_name: &str,
) -> RustOutput {
    let mut rust_code: Vec<String> = Vec::new();
    let mut table = RoutineTable::new();

    rust_code.push(header(source_name));

    for decl in &schema.enums {
        rust_code.push(generate_enum(decl, encoding));
    }

    for message in &schema.messages {
        rust_code.push(generate_struct(message, encoding));
        match encoding {
            EncodeMode::Binary => rust_code.push(binary_message_impl(message, &mut table)),
            EncodeMode::Json   => rust_code.push(json_message_impl(message)),
        }
    }

    if !table.is_empty() {
        debug!(routines = table.len(), "shared codec routines emitted");
        rust_code.push(table.code().trim_start().to_string());
    }

    RustOutput {
        types:    rust_code.join("\n"),
        services: compile_services_to_rust(&schema.services, source_name),
    }
}

/// Enums are `uint32` on the wire. The first variant is the zero value.
fn generate_enum(decl: &EnumDecl, encoding: EncodeMode) -> String {
    let enum_name = type_ident(&decl.name);
    let mut derives = String::from("Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord");

    if decl.variants.is_empty() {
        if encoding == EncodeMode::Json {
            derives.push_str(", ");
            derives.push_str(SERDE_DERIVES);
            return format!("#[derive({})]\n{}\npub enum {} {{}}\n", derives, SERDE_CRATE, enum_name);
        }
        return format!("#[derive({})]\npub enum {} {{}}\n", derives, enum_name);
    }

    derives.push_str(", Default");
    if encoding == EncodeMode::Json {
        derives.push_str(", ");
        derives.push_str(SERDE_DERIVES);
    }

    let mut lines = vec![format!("#[derive({})]", derives)];
    if encoding == EncodeMode::Json {
        lines.push(SERDE_CRATE.to_string());
    }
    lines.push("#[repr(u32)]".to_string());
    lines.push(format!("pub enum {} {{", enum_name));
    for (i, variant) in decl.variants.iter().enumerate() {
        if i == 0 {
            lines.push("    #[default]".to_string());
        }
        lines.push(format!("    {} = {},", type_ident(variant), i));
    }
    lines.push("}\n".to_string());

    if encoding == EncodeMode::Binary {
        lines.push(generate_enum_try_from(decl));
    }
    lines.join("\n")
}

fn generate_enum_try_from(decl: &EnumDecl) -> String {
    let enum_name = type_ident(&decl.name);
    let mut match_arms = Vec::new();
    for (i, variant) in decl.variants.iter().enumerate() {
        match_arms.push(format!(
            "            {} => Ok({}::{}),",
            i,
            enum_name,
            type_ident(variant)
        ));
    }
    match_arms.push(format!(
        "            _ => Err(::dgen::wire::WireError::InvalidEnumValue {{ name: {:?}.to_string(), value }}),",
        decl.name
    ));

    format!(
        "impl ::std::convert::TryFrom<u32> for {} {{\n    type Error = ::dgen::wire::WireError;\n\n    fn try_from(value: u32) -> ::std::result::Result<Self, Self::Error> {{\n        match value {{\n{}\n        }}\n    }}\n}}\n",
        enum_name,
        match_arms.join("\n")
    )
}

fn generate_struct(message: &ResolvedMessage, encoding: EncodeMode) -> String {
    let struct_name = type_ident(&message.name);
    let mut lines = Vec::new();

    match encoding {
        EncodeMode::Binary => lines.push("#[derive(Debug, Clone, Default, PartialEq)]".to_string()),
        EncodeMode::Json => {
            lines.push(format!("#[derive(Debug, Clone, Default, PartialEq, {})]", SERDE_DERIVES));
            lines.push(SERDE_CRATE.to_string());
        }
    }

    if message.fields.is_empty() {
        lines.push(format!("pub struct {} {{}}\n", struct_name));
        return lines.join("\n");
    }

    lines.push(format!("pub struct {} {{", struct_name));
    for field in &message.fields {
        lines.push(format!(
            "    pub {}: {},",
            field_ident(&field.name),
            field_rust_type(&field.ty)
        ));
    }
    lines.push("}\n".to_string());
    lines.join("\n")
}

/// The `rust` backend. Writes `<stem>.rs` and `<stem>_rpc.rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn generate(
        &self,
        source_name: &str,
        stem: &str,
        schema: &ResolvedSchema,
        encoding: EncodeMode,
    ) -> Result<Vec<GeneratedFile>, DgenError> {
        let output = compile_schema_to_rust(schema, encoding, source_name);
        Ok(vec![
            GeneratedFile {
                path:    PathBuf::from(format!("{}.rs", stem)),
                content: output.types,
            },
            GeneratedFile {
                path:    PathBuf::from(format!("{}_rpc.rs", stem)),
                content: output.services,
            },
        ])
    }
}
