// Config loading and validation tests

use statkeeper::config::AppConfig;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[server]
port = 8080
host = "0.0.0.0"

[history]
update_period_ms = 10000
cpu_sample_duration_ms = 2000
capacity = 360
consolidation_limit = 6

[persistence]
directory = "data/history"
size_limit_bytes = 65536
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.history.update_period_ms, 10_000);
    assert_eq!(config.history.capacity, 360);
    assert_eq!(config.history.consolidation_limit, 6);
    let persistence = config.persistence.expect("persistence section");
    assert_eq!(persistence.directory, "data/history");
    assert_eq!(persistence.size_limit_bytes, 65_536);
}

#[test]
fn test_config_persistence_is_optional() {
    let no_persistence = VALID_CONFIG
        .split("[persistence]")
        .next()
        .unwrap()
        .to_string();
    let config = AppConfig::load_from_str(&no_persistence).expect("valid");
    assert!(config.persistence.is_none());
    assert!(config.updater_config().persistence.is_none());
}

#[test]
fn test_config_size_limit_defaults_when_omitted() {
    let cfg = VALID_CONFIG.replace("size_limit_bytes = 65536", "");
    let config = AppConfig::load_from_str(&cfg).expect("valid");
    assert_eq!(config.persistence.unwrap().size_limit_bytes, 1024 * 1024);
}

#[test]
fn test_config_converts_to_updater_config() {
    let updater = AppConfig::load_from_str(VALID_CONFIG)
        .unwrap()
        .updater_config();
    assert_eq!(updater.update_period, Duration::from_secs(10));
    assert_eq!(updater.cpu_sample_duration, Duration::from_secs(2));
    assert_eq!(updater.history_capacity, 360);
    assert_eq!(updater.consolidation_limit, 6);
    let p = updater.persistence.as_ref().unwrap();
    assert_eq!(p.directory, std::path::PathBuf::from("data/history"));
    assert_eq!(p.size_limit_bytes, 65_536);
    assert!(updater.validate().is_ok());
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8080", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_sample_not_shorter_than_period() {
    let bad = VALID_CONFIG.replace(
        "cpu_sample_duration_ms = 2000",
        "cpu_sample_duration_ms = 10000",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("cpu_sample_duration_ms"));
}

#[test]
fn test_config_validation_rejects_update_period_zero() {
    let bad = VALID_CONFIG
        .replace("update_period_ms = 10000", "update_period_ms = 0")
        .replace("cpu_sample_duration_ms = 2000", "cpu_sample_duration_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("update_period_ms"));
}

#[test]
fn test_config_validation_rejects_capacity_zero() {
    let bad = VALID_CONFIG.replace("capacity = 360", "capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("history.capacity"));
}

#[test]
fn test_config_validation_rejects_consolidation_limit_zero() {
    let bad = VALID_CONFIG.replace("consolidation_limit = 6", "consolidation_limit = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("consolidation_limit"));
}

#[test]
fn test_config_validation_rejects_empty_persistence_directory() {
    let bad = VALID_CONFIG.replace("directory = \"data/history\"", "directory = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("persistence.directory"));
}

#[test]
fn test_config_validation_rejects_size_limit_zero() {
    let bad = VALID_CONFIG.replace("size_limit_bytes = 65536", "size_limit_bytes = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("size_limit_bytes"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.history.cpu_sample_duration_ms, 2000);
}
