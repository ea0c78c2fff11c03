//! `check` against the real compiler and sandbox.

use implicit_live::AppConfig;
use implicit_live_cli::{check, load_config, read_source, CheckOutput};
use implicit_sandbox::SandboxResponse;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

#[tokio::test]
async fn clean_script_prints_its_exports() {
    let output = check(
        &AppConfig::default(),
        "import \"implicit\" as i;\nlet size = 4;\ni::circle(0, 0, size)",
    )
    .await
    .unwrap();

    assert!(output.succeeded());
    let CheckOutput::Executed(SandboxResponse::Ok { exports }) = &output else {
        panic!("expected exports, got {output:?}");
    };
    assert_eq!(exports.get("size"), Some(&json!(4)));
    assert_eq!(
        exports.default_export(),
        Some(&json!({"kind": "circle", "x": 0.0, "y": 0.0, "r": 4.0}))
    );
}

#[tokio::test]
async fn parse_error_is_reported_as_diagnostics() {
    let output = check(&AppConfig::default(), "let x = ;").await.unwrap();

    assert!(!output.succeeded());
    let CheckOutput::Diagnostics(bundle) = output else {
        panic!("expected diagnostics");
    };
    assert_eq!(bundle.syntax.len(), 1);
    assert!(bundle.runtime.is_empty());
}

#[tokio::test]
async fn runtime_throw_keeps_its_position() {
    let output = check(
        &AppConfig::default(),
        "let a = 1;\n  throw \"boom\";",
    )
    .await
    .unwrap();

    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(
        value,
        json!({"executed": {"status": "err", "error": {"line_num": 2, "col_num": 3, "message": "boom"}}})
    );
}

#[test]
fn sources_are_read_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "1 + 1").unwrap();

    assert_eq!(read_source(file.path()).unwrap(), "1 + 1");
    assert!(read_source(&file.path().with_extension("missing")).is_err());
}

#[test]
fn defaults_without_a_config_file() {
    let config = load_config(None, None).unwrap();
    assert_eq!(config, AppConfig::default());
}
