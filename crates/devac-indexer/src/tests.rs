//! Crate-level integration tests over `ParserRegistry`.

use std::path::PathBuf;

use devac_core::NodeKind;

use crate::{ParseConfig, ParserRegistry};

fn config() -> ParseConfig {
    ParseConfig { repo_name: "r".into(), package_path: "pkg".into(), ..Default::default() }
}

#[test]
fn routes_every_known_extension_and_falls_back_to_generic() {
    let registry = ParserRegistry::new();
    let cases = [
        ("main.rs", devac_core::Language::Rust),
        ("app.ts", devac_core::Language::TypeScript),
        ("index.js", devac_core::Language::JavaScript),
        ("lib.py", devac_core::Language::Python),
        ("main.go", devac_core::Language::Go),
        ("Main.java", devac_core::Language::Java),
        ("unknown.xyz", devac_core::Language::Other),
    ];
    for (filename, expected) in cases {
        let path = PathBuf::from(filename);
        let backend = registry.backend_for(&path);
        assert_eq!(backend.language(), expected, "wrong backend for {filename}");
    }
}

#[test]
fn rust_extraction_produces_function_and_struct_nodes() {
    let registry = ParserRegistry::new();
    let source = b"fn main() {\n    helper();\n}\n\nfn helper() -> i32 {\n    42\n}\n\nstruct User {\n    name: String,\n}\n";
    let out = registry.backend_for(std::path::Path::new("test.rs")).parse_content(source, std::path::Path::new("test.rs"), &config()).unwrap();

    let functions: Vec<_> = out.nodes.iter().filter(|n| n.kind == NodeKind::Function).collect();
    assert!(functions.iter().any(|f| f.name == "main"));
    assert!(functions.iter().any(|f| f.name == "helper"));
    assert!(out.nodes.iter().any(|n| n.kind == NodeKind::Class && n.name == "User"));
}

#[test]
fn javascript_extraction_produces_function_and_class_nodes() {
    let registry = ParserRegistry::new();
    let source = b"function greet(name) {\n    return name;\n}\n\nclass Person {\n    greet() {\n        return this.name;\n    }\n}\n";
    let out = registry.backend_for(std::path::Path::new("test.js")).parse_content(source, std::path::Path::new("test.js"), &config()).unwrap();

    assert!(out.nodes.iter().any(|n| n.kind == NodeKind::Function && n.name == "greet"));
    assert!(out.nodes.iter().any(|n| n.kind == NodeKind::Class && n.name == "Person"));
}

#[test]
fn python_extraction_produces_import_external_refs() {
    let registry = ParserRegistry::new();
    let source = b"import os\nfrom pathlib import Path\n\ndef process_file(path):\n    return path\n";
    let out = registry.backend_for(std::path::Path::new("test.py")).parse_content(source, std::path::Path::new("test.py"), &config()).unwrap();

    assert!(!out.external_refs.is_empty());
    assert!(out.external_refs.iter().any(|r| r.module_specifier == "pathlib"));
}

#[test]
fn empty_file_still_yields_a_module_node() {
    let registry = ParserRegistry::new();
    let out = registry.backend_for(std::path::Path::new("empty.rs")).parse_content(b"", std::path::Path::new("empty.rs"), &config()).unwrap();
    assert_eq!(out.nodes.len(), 1);
    assert_eq!(out.nodes[0].kind, NodeKind::Module);
}

#[test]
fn invalid_utf8_is_rejected_not_panicked() {
    let registry = ParserRegistry::new();
    let invalid = vec![0xFF, 0xFE, 0xFD];
    let result = registry.backend_for(std::path::Path::new("binary.rs")).parse_content(&invalid, std::path::Path::new("binary.rs"), &config());
    assert!(result.is_err());
}
