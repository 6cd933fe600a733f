use gma_core::config::GmaConfig;
use gma_core::report::Granularity;
use gma_infrastructure::ConfigStorage;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let storage = ConfigStorage::with_path(temp_dir.path().join("config.toml"));

    assert!(!storage.exists());
    let config = storage.load().expect("Should fall back to defaults");
    assert_eq!(config, GmaConfig::default());
}

#[test]
fn test_save_and_load_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");
    let storage = ConfigStorage::with_path(config_path.clone());

    let mut config = GmaConfig::new("https://gma.test/", "https://cas.test/cas")
        .with_forwarded_for("192.168.1.20")
        .with_delayed_save(Duration::from_millis(500));
    config.report_format.granularity = Granularity::Yearly;

    storage.save(&config).expect("Should save config");
    assert!(config_path.exists());

    let loaded = storage.load().expect("Should load config");
    assert_eq!(loaded, config);
    assert_eq!(loaded.report_format.granularity.code(), 5);
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "gma_base = [not toml").unwrap();

    let storage = ConfigStorage::with_path(config_path);
    let err = storage.load().unwrap_err();
    assert!(err.to_string().contains("TOML"));
}
