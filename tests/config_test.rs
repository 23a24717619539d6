//! Tests for layered settings loading

use std::path::PathBuf;

use prompt_kun::config::Settings;
use prompt_kun::domain::FactorPolicy;
use prompt_kun::util::testing;
use tempfile::TempDir;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

#[test]
fn given_local_config_when_loading_then_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("prompt-kun.toml");
    std::fs::write(
        &path,
        r#"
store_dir = "/var/lib/prompt-kun"
storage_key = "studio"
factor_policy = "inherit"
pretty_export = false

[seed]
positive = "best quality"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).unwrap();

    assert_eq!(settings.store_dir, PathBuf::from("/var/lib/prompt-kun"));
    assert_eq!(settings.storage_key, "studio");
    assert_eq!(settings.factor_policy, FactorPolicy::Inherit);
    assert!(!settings.pretty_export);
    assert_eq!(settings.seed.positive, "best quality");
    assert_eq!(settings.seed.negative, "worst quality");
}

#[test]
fn given_missing_local_config_when_loading_then_config_error() {
    let temp = TempDir::new().unwrap();

    let result = Settings::load(Some(&temp.path().join("absent.toml")));

    assert!(result.is_err());
}

#[test]
fn given_invalid_toml_when_loading_then_error_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "factor_policy = \"boost\"").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err().to_string();

    assert!(err.contains("broken.toml"), "error: {err}");
}

#[test]
fn given_blank_storage_key_when_loading_then_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("blank.toml");
    std::fs::write(&path, "storage_key = \"  \"").unwrap();

    assert!(Settings::load(Some(&path)).is_err());
}

#[test]
fn given_settings_when_rendered_as_toml_then_reloads_identically() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("roundtrip.toml");
    let original = Settings {
        store_dir: temp.path().join("store"),
        storage_key: "roundtrip".into(),
        factor_policy: FactorPolicy::Inherit,
        pretty_export: false,
        ..Settings::default()
    };
    std::fs::write(&path, original.to_toml().unwrap()).unwrap();

    let loaded = Settings::load(Some(&path)).unwrap();

    assert_eq!(loaded, original);
}
