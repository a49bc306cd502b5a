use std::fs;

use lingcat_catalog::{ConfigError, LingcatConfig, SchemaPolicy};
use tempfile::tempdir;

#[test]
fn missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let config =
        LingcatConfig::load_or_default(temp.path().join("lingcat.json")).expect("defaults");
    assert_eq!(config, LingcatConfig::default());
    assert_eq!(config.schema_policy, SchemaPolicy::Lenient);
    assert!(config.include_unfinished);
    assert!(config.checks.numerus_arity);
}

#[test]
fn partial_file_keeps_remaining_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("lingcat.json");
    fs::write(
        &path,
        r#"{ "schema_policy": "strict", "checks": { "place_markers": false } }"#,
    )
    .expect("write config");

    let config = LingcatConfig::load(&path).expect("load");
    assert_eq!(config.schema_policy, SchemaPolicy::Strict);
    assert!(config.include_unfinished);
    assert!(!config.checks.place_markers);
    assert!(config.checks.duplicates);
}

#[test]
fn invalid_json_is_reported() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("lingcat.json");
    fs::write(&path, "{ schema_policy: ").expect("write config");

    match LingcatConfig::load_or_default(&path).unwrap_err() {
        ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other:?}"),
    }
}
