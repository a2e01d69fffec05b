use super::GatewayConfig;
use std::path::Path;

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = GatewayConfig::load(Path::new("/nonexistent/warden.toml")).unwrap();
    assert_eq!(cfg.consul.address, "http://localhost:8500");
}

#[test]
fn test_load_toml_config() {
    let toml_str = r#"
        [consul]
        address = "http://consul.internal:8500"
        service_name = "weather"
    "#;
    let tmp = std::env::temp_dir().join("warden_test_config.toml");
    std::fs::write(&tmp, toml_str).unwrap();
    let cfg = GatewayConfig::load(&tmp).unwrap();
    assert_eq!(cfg.consul.address, "http://consul.internal:8500");
    assert_eq!(cfg.consul.service_name, "weather");
    std::fs::remove_file(&tmp).ok();
}

#[test]
fn test_load_json_config() {
    let json = r#"{"consul": {"address": "http://127.0.0.1:8500", "service_name": "forecast"}}"#;
    let tmp = std::env::temp_dir().join("warden_test_config.json");
    std::fs::write(&tmp, json).unwrap();
    let cfg = GatewayConfig::load(&tmp).unwrap();
    assert_eq!(cfg.consul.address, "http://127.0.0.1:8500");
    assert_eq!(cfg.consul.service_name, "forecast");
    std::fs::remove_file(&tmp).ok();
}

#[test]
fn test_unsupported_format() {
    let tmp = std::env::temp_dir().join("warden_test.yml");
    std::fs::write(&tmp, "key: value").unwrap();
    assert!(GatewayConfig::load(&tmp).is_err());
    std::fs::remove_file(&tmp).ok();
}

#[test]
fn test_no_extension_is_error() {
    let tmp = std::env::temp_dir().join("warden_test_noext");
    std::fs::write(&tmp, "address = \"http://x\"").unwrap();
    assert!(GatewayConfig::load(&tmp).is_err());
    std::fs::remove_file(&tmp).ok();
}

#[test]
fn test_validate_rejects_bad_http_scheme() {
    let mut cfg = GatewayConfig::default();
    cfg.consul.http_scheme = "ftp".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_protocol() {
    let mut cfg = GatewayConfig::default();
    cfg.consul.protocol = "carrier-pigeon".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_service_port() {
    let mut cfg = GatewayConfig::default();
    cfg.consul.service_port = Some(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_malformed_address() {
    let mut cfg = GatewayConfig::default();
    cfg.consul.address = "consul.internal:8500".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_accepts_defaults() {
    assert!(GatewayConfig::default().validate().is_ok());
}
