use std::time::Duration;

use hcm_core::config::{ConfigError, ConfigProperties, ConfigValue, HcmConfig};
use hcm_core::{LogConfig, LogFormat};
use serial_test::serial;

#[test]
fn test_empty_config() {
    let config = HcmConfig::empty();
    assert!(matches!(
        config.get::<String>("nonexistent"),
        Err(ConfigError::NotFound(_))
    ));
    assert_eq!(config.profile(), "test");
}

#[test]
fn test_set_and_get() {
    let mut config = HcmConfig::empty();
    config.set("hcm.name", ConfigValue::String("data-service".into()));
    assert_eq!(config.get::<String>("hcm.name").unwrap(), "data-service");
    assert!(config.has_section("hcm"));
    assert!(!config.has_section("hc"));
}

#[test]
fn test_get_or_default_and_malformed() {
    let mut config = HcmConfig::empty();
    assert_eq!(config.get_or("missing", 42u32).unwrap(), 42);

    config.set("hcm.database.max_connections", ConfigValue::String("many".into()));
    assert!(matches!(
        config.get_or("hcm.database.max_connections", 10u32),
        Err(ConfigError::TypeMismatch { .. })
    ));
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
hcm:
  database:
    url: "sqlite::memory:"
    max_connections: 10
    slow_request: 50ms
  log:
    format: json
"#;
    let config = HcmConfig::from_yaml_str(yaml, "test").unwrap();
    assert_eq!(
        config.get::<String>("hcm.database.url").unwrap(),
        "sqlite::memory:"
    );
    assert_eq!(config.get::<u32>("hcm.database.max_connections").unwrap(), 10);
    assert_eq!(
        config.get::<Duration>("hcm.database.slow_request").unwrap(),
        Duration::from_millis(50)
    );
}

#[test]
fn test_log_section() {
    let config = HcmConfig::from_yaml_str("hcm:\n  log:\n    format: json\n", "test").unwrap();
    let log: LogConfig = config.section().unwrap();
    assert_eq!(log.format, LogFormat::Json);
    assert_eq!(log.level, "info");

    let defaulted = LogConfig::from_config_or(&HcmConfig::empty(), LogConfig::default()).unwrap();
    assert_eq!(defaulted, LogConfig::default());

    let bad = HcmConfig::from_yaml_str("hcm:\n  log:\n    format: xml\n", "test").unwrap();
    assert!(matches!(
        bad.section::<LogConfig>(),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
#[serial]
fn test_load_from_dir_with_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("application.yaml"),
        "hcm:\n  database:\n    url: base\n    max_page_limit: 500\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("application-prod.yaml"),
        "hcm:\n  database:\n    url: prod\n",
    )
    .unwrap();

    std::env::remove_var("HCM_PROFILE");
    std::env::set_var("HCM_DATABASE_MAX_PAGE_LIMIT", "200");
    let config = HcmConfig::load_from_dir(dir.path(), "prod").unwrap();
    std::env::remove_var("HCM_DATABASE_MAX_PAGE_LIMIT");

    assert_eq!(config.profile(), "prod");
    assert_eq!(config.get::<String>("hcm.database.url").unwrap(), "prod");
    assert_eq!(config.get::<u32>("hcm.database.max_page_limit").unwrap(), 200);
}

#[test]
fn test_invalid_yaml() {
    assert!(matches!(
        HcmConfig::from_yaml_str("hcm: [unclosed", "test"),
        Err(ConfigError::Load(_))
    ));
}
