//! Runs every JSON syntax tree under `tests/fixtures` through a fresh
//! session and compares the reported error codes and imports.

use compiler::ast::Ast;
use compiler::{Session, SessionConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn fixture_files() -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn strings(value: Option<&Value>) -> Vec<String> {
    let mut items: Vec<String> = value
        .and_then(Value::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    items.sort();
    items
}

#[test]
fn test_fixtures() {
    compiler::logging::init_test();
    let files = fixture_files();
    assert!(!files.is_empty(), "no fixtures found");

    for path in files {
        let text = std::fs::read_to_string(&path).unwrap();
        let fixture: Value = serde_json::from_str(&text).unwrap();
        let mut ast = Ast::from_json(&fixture["ast"].to_string())
            .unwrap_or_else(|e| panic!("{}: {}", path.display(), e));

        let mut session = Session::new(SessionConfig::default());
        let analysis = session.analyze(&mut ast);

        let mut errors: Vec<String> = analysis
            .diagnostics
            .errors()
            .filter_map(|d| d.code.clone())
            .collect();
        errors.sort();
        let expected = strings(fixture["expect"].get("errors"));
        assert_eq!(errors, expected, "{}", path.display());
        assert_eq!(analysis.can_generate(), expected.is_empty(), "{}", path.display());

        if let Some(imports) = fixture["expect"].get("imports") {
            let mut found: Vec<String> = analysis
                .imports
                .iter()
                .map(|request| request.path.to_string_lossy().replace('\\', "/"))
                .collect();
            found.sort();
            assert_eq!(found, strings(Some(imports)), "{}", path.display());
        }
    }
}
