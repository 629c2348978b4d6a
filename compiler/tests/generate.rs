use std::fs;

use dgen_compiler::{generate, generate_source, DgenError, EncodeMode, GenerateConfig, Value};

const SEARCH: &str = r#"
# comment
enum Corpus { universal, web, }

message SearchRequest {
    seq=1 string query;
    optional seq=2 int32 page;
    optional seq=3 Corpus corpus;
    optional seq=4 list[int32] ids;
}

message SearchResponse {
    optional seq=1 list[int32] ids;
    optional seq=2 map[string]list[int32] groups;
}

service SearchService {
    Search(SearchRequest) return (SearchResponse);
}
"#;

#[test]
fn generate_writes_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("search.dg");
    fs::write(&source, SEARCH).unwrap();
    let out = dir.path().join("gen").join("nested");

    let files = generate(&GenerateConfig::new(&source, &out)).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(names, vec![out.join("search.rs"), out.join("search_rpc.rs")]);

    let types = fs::read_to_string(out.join("search.rs")).unwrap();
    assert!(types.starts_with("// Code generated by dgen from search.dg. DO NOT EDIT."));
    assert!(types.contains("pub struct SearchRequest {"));
    assert_eq!(types.matches("fn marshal_list_int32(").count(), 1);

    let rpc = fs::read_to_string(out.join("search_rpc.rs")).unwrap();
    assert!(rpc.contains("pub fn register_search_service<R, T>"));
}

#[test]
fn generate_reports_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = GenerateConfig::new(dir.path().join("missing.dg"), dir.path());
    assert!(matches!(generate(&config), Err(DgenError::Io(_))));
}

#[test]
fn failed_generation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("bad.dg");
    fs::write(&source, "message A { seq=1 Missing m; }").unwrap();
    let out = dir.path().join("out");

    let err = generate(&GenerateConfig::new(&source, &out)).unwrap_err();
    assert!(matches!(err, DgenError::UnresolvedType { .. }), "got {:?}", err);
    assert!(!out.exists());
}

#[test]
fn json_encoding_and_unknown_backend() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("search.dg");
    fs::write(&source, SEARCH).unwrap();

    let config = GenerateConfig::new(&source, dir.path()).with_encoding(EncodeMode::Json);
    let files = generate(&config).unwrap();
    assert!(files[0].content.contains("::dgen::serde_json::from_slice(data)"));

    let config = GenerateConfig::new(&source, dir.path()).with_backend("go");
    assert!(matches!(generate(&config), Err(DgenError::UnknownBackend(_))));
}

#[test]
fn generation_is_deterministic() {
    let a = generate_source("s.dg", "s", SEARCH, "rust", EncodeMode::Binary).unwrap();
    let b = generate_source("s.dg", "s", SEARCH, "rust", EncodeMode::Binary).unwrap();
    assert_eq!(a, b);
}

#[test]
fn dynamic_codec_matches_the_documented_bytes() {
    let schema = dgen_compiler::compile_schema(
        "message P { seq=1 string name; optional seq=2 int32 age; }",
    )
    .unwrap();
    let value = Value::decode(&schema, "P", &[1, 3, 0, 0, 0, b'a', b'n', b'n']).unwrap();
    assert_eq!(value.to_json(), serde_json::json!({ "name": "ann" }));
    assert_eq!(value.encode(&schema).unwrap(), vec![1, 3, 0, 0, 0, b'a', b'n', b'n']);
}

#[test]
fn parse_errors_carry_positions() {
    let err = generate_source("s.dg", "s", "message A {\n  seq=x int32 a;\n}", "rust", EncodeMode::Binary)
        .unwrap_err();
    match err {
        DgenError::ParseError { line, column, .. } => assert_eq!((line, column), (2, 7)),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn colliding_rust_names_are_rejected_before_generation() {
    let schemas = [
        "message Search {}\nservice search { Do(Search); }",
        "message Req {}\nmessage SearchHandler {}\nservice Search { Do(Req); }",
        "message A { seq=1 int32 pageNumber; optional seq=2 int32 page_number; }",
        "message Req {}\nservice S { Search(Req); search(Req); }",
    ];
    for schema in schemas {
        let err = generate_source("s.dg", "s", schema, "rust", EncodeMode::Binary).unwrap_err();
        assert!(matches!(err, DgenError::DuplicateDefinition(_)), "{}: got {:?}", schema, err);
    }
}

#[test]
fn non_rust_identifiers_are_parse_errors() {
    let err = generate_source("s.dg", "s", "message A { seq=1 int32 my-field; }", "rust", EncodeMode::Binary)
        .unwrap_err();
    match err {
        DgenError::ParseError { msg, line, column } => {
            assert_eq!(msg, "Invalid identifier \"my-field\"");
            assert_eq!((line, column), (1, 25));
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}
