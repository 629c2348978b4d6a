use std::path::PathBuf;

use crate::{compiler::EncodeMode, error::DgenError, resolver::ResolvedSchema};

/// A generated source file. `path` is relative to the output directory until
/// the file has been written by `generate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path:    PathBuf,
    pub content: String,
}

/// A code generation target. Backends only ever see fully resolved schemas.
pub trait Backend {
    /// The name used to select this backend, e.g. `"rust"`.
    fn name(&self) -> &'static str;

    /// Renders `schema`. `source_name` is the schema file name as it should
    /// appear in generated headers; `stem` names the output files.
    fn generate(
        &self,
        source_name: &str,
        stem: &str,
        schema: &ResolvedSchema,
        encoding: EncodeMode,
    ) -> Result<Vec<GeneratedFile>, DgenError>;
}
