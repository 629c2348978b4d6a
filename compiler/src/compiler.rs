use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::DgenError,
    gen_rust::RustBackend,
    parser::parse_schema,
    resolver::{resolve_schema, ResolvedSchema},
    tokenizer::tokenize_schema,
    traits::{Backend, GeneratedFile},
    types::Schema,
};

/// How generated messages are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeMode {
    /// The tag-aligned binary wire format.
    #[default]
    Binary,
    /// A pass-through to `serde_json`.
    Json,
}

impl FromStr for EncodeMode {
    type Err = DgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(EncodeMode::Binary),
            "json"   => Ok(EncodeMode::Json),
            other    => Err(DgenError::UnknownEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for EncodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeMode::Binary => f.write_str("binary"),
            EncodeMode::Json   => f.write_str("json"),
        }
    }
}

/// Everything `generate` needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// The schema file to compile.
    pub source:     PathBuf,
    /// Where generated files are written. Created if missing.
    pub output_dir: PathBuf,
    #[serde(default = "default_backend")]
    pub backend:    String,
    #[serde(default)]
    pub encoding:   EncodeMode,
}

fn default_backend() -> String {
    "rust".to_string()
}

impl GenerateConfig {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source:     source.into(),
            output_dir: output_dir.into(),
            backend:    default_backend(),
            encoding:   EncodeMode::default(),
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_encoding(mut self, encoding: EncodeMode) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Looks up a backend by name.
pub fn backend_for(name: &str) -> Result<Box<dyn Backend>, DgenError> {
    match name {
        "rust" => Ok(Box::new(RustBackend)),
        other  => Err(DgenError::UnknownBackend(other.to_string())),
    }
}

/// Tokenizes and parses schema text without resolving names.
pub fn parse_source(text: &str) -> Result<Schema, DgenError> {
    let tokens = tokenize_schema(text);
    debug!(tokens = tokens.len(), "tokenized schema");
    let schema = parse_schema(&tokens)?;
    debug!(
        enums = schema.enums.len(),
        messages = schema.messages.len(),
        services = schema.services.len(),
        "parsed schema"
    );
    Ok(schema)
}

/// Compile schema text into a resolved schema.
/// Returns `Err(DgenError)` if parsing or resolution fails.
pub fn compile_schema(text: &str) -> Result<ResolvedSchema, DgenError> {
    let schema = parse_source(text)?;
    resolve_schema(&schema)
}

/// Runs the whole pipeline on in-memory text. Returned paths are bare file
/// names.
pub fn generate_source(
    source_name: &str,
    stem: &str,
    text: &str,
    backend: &str,
    encoding: EncodeMode,
) -> Result<Vec<GeneratedFile>, DgenError> {
    let backend = backend_for(backend)?;
    let schema = compile_schema(text)?;
    debug!(backend = backend.name(), %encoding, "generating");
    backend.generate(source_name, stem, &schema, encoding)
}

/// `search.dg` -> `search`; `a.b.dg` -> `a`.
fn output_stem(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "schema".to_string())
}

/// Reads `config.source`, compiles it and writes the generated files into
/// `config.output_dir`. Nothing is written if any phase fails. Returns the
/// written files with their full paths.
pub fn generate(config: &GenerateConfig) -> Result<Vec<GeneratedFile>, DgenError> {
    let text = fs::read_to_string(&config.source)?;
    let source_name = config
        .source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = output_stem(&config.source);

    let files = generate_source(&source_name, &stem, &text, &config.backend, config.encoding)?;

    fs::create_dir_all(&config.output_dir)?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = config.output_dir.join(&file.path);
        fs::write(&path, &file.content)?;
        info!(path = %path.display(), bytes = file.content.len(), "wrote generated file");
        written.push(GeneratedFile { path, content: file.content });
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_mode_from_str() {
        assert_eq!("binary".parse::<EncodeMode>().unwrap(), EncodeMode::Binary);
        assert_eq!("json".parse::<EncodeMode>().unwrap(), EncodeMode::Json);
        let err = "yaml".parse::<EncodeMode>().unwrap_err();
        assert!(matches!(err, DgenError::UnknownEncoding(ref s) if s == "yaml"));
        assert_eq!(EncodeMode::Json.to_string(), "json");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GenerateConfig =
            serde_json::from_str(r#"{"source": "search.dg", "output_dir": "out"}"#).unwrap();
        assert_eq!(config, GenerateConfig::new("search.dg", "out"));

        let config: GenerateConfig = serde_json::from_str(
            r#"{"source": "a.dg", "output_dir": "o", "backend": "rust", "encoding": "json"}"#,
        )
        .unwrap();
        assert_eq!(config.encoding, EncodeMode::Json);
    }

    #[test]
    fn test_unknown_backend() {
        let err = generate_source("a.dg", "a", "message A {}", "go", EncodeMode::Binary).unwrap_err();
        assert_eq!(err.to_string(), "Unknown backend \"go\"");
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("schemas/search.dg")), "search");
        assert_eq!(output_stem(Path::new("a.b.dg")), "a");
        assert_eq!(output_stem(Path::new("plain")), "plain");
    }

    #[test]
    fn test_parse_errors_surface_before_generation() {
        let err = generate_source("a.dg", "a", "message A { seq=1 int32 }", "rust", EncodeMode::Binary)
            .unwrap_err();
        assert!(matches!(err, DgenError::ParseError { line: 1, .. }), "got {:?}", err);
    }
}
