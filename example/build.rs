// Generates Rust sources for every schema under `schema/` into OUT_DIR.
// `src/lib.rs` pulls them in with `include!`.

use std::{env, error::Error, path::PathBuf};

use dgen_compiler::{generate, EncodeMode, GenerateConfig};

const SCHEMAS: [(&str, EncodeMode); 3] = [
    ("schema/search.dg", EncodeMode::Binary),
    ("schema/cases.dg", EncodeMode::Binary),
    ("schema/contacts.dg", EncodeMode::Json),
];

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=schema");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    for (schema, encoding) in SCHEMAS {
        println!("cargo:rerun-if-changed={}", schema);
        generate(&GenerateConfig::new(schema, &out_dir).with_encoding(encoding))?;
    }

    Ok(())
}
