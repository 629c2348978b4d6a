use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;

use dgen_compiler::{generate, parse_source, compile_schema, DgenError, EncodeMode, GenerateConfig, Value};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dgen")]
#[command(about = "Generate codecs and service stubs from dgen schemas", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Binary,
    Json,
}

impl From<Encoding> for EncodeMode {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Binary => EncodeMode::Binary,
            Encoding::Json   => EncodeMode::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate source files from a `.dg` schema
    Generate {
        /// Input `.dg` schema file
        #[arg(short, long)]
        file: PathBuf,

        /// Target language
        #[arg(short, long, default_value = "rust")]
        language: String,

        /// Output directory (created if missing)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Message encoding
        #[arg(short, long, value_enum, default_value_t = Encoding::Binary)]
        encoding: Encoding,
    },

    /// Parse a `.dg` schema and print it as JSON
    Parse {
        /// Input `.dg` schema file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Decode a binary-encoded message and print it as JSON
    Decode {
        /// The `.dg` schema declaring the message
        #[arg(short, long)]
        file: PathBuf,

        /// Name of the message type encoded in the input
        #[arg(short, long)]
        message: String,

        /// File holding the encoded bytes
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), DgenError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Generate { file, language, output, encoding } => {
            let config = GenerateConfig::new(file, output)
                .with_backend(language.as_str())
                .with_encoding((*encoding).into());
            let files = generate(&config)?;
            for file in &files {
                println!("{}", file.path.display());
            }
            Ok(())
        }

        Commands::Parse { file } => {
            let text = fs::read_to_string(file)?;
            let schema = parse_source(&text)?;
            let json = serde_json::to_string_pretty(&schema)
                .map_err(|e| DgenError::EncodeError(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }

        Commands::Decode { file, message, input } => {
            let text = fs::read_to_string(file)?;
            let schema = compile_schema(&text)?;
            let data = fs::read(input)?;
            debug!(bytes = data.len(), message = %message, "decoding");
            let value = Value::decode(&schema, message, &data)?;
            let json = serde_json::to_string_pretty(&value.to_json())
                .map_err(|e| DgenError::EncodeError(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }
    }
}
