//! Config save/load roundtrip integration tests.

use hiven_core::config::{Config, ConfigBuilder, LogFormat};
use hiven_core::ConfigError;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hiven.json5");

    let config = ConfigBuilder::new()
        .token("tok")
        .heartbeat_interval_ms(5_000)
        .log_format(LogFormat::Json)
        .build();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.token.as_ref().map(|t| t.expose()), Some("tok"));
    assert_eq!(loaded.gateway.heartbeat_interval_ms, 5_000);
    assert_eq!(loaded.gateway.url, config.gateway.url);
    assert_eq!(loaded.logging.format, LogFormat::Json);
}

#[test]
fn test_json5_comments_and_partial_sections() {
    let config = Config::parse(
        r#"{
            // trailing commas and comments are fine
            token: "tok",
            api: { timeout_secs: 5, },
        }"#,
    )
    .unwrap();

    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.api.base_url, "https://api.hiven.io");
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    assert!(matches!(
        Config::load(Path::new("/nonexistent/hiven.json5")),
        Err(ConfigError::NotFound(_))
    ));

    let config = Config::load_with_env(Some(Path::new("/nonexistent/hiven.json5"))).unwrap();
    assert_eq!(config.gateway.heartbeat_interval_ms, 30_000);
}

#[test]
fn test_config_parse_invalid() {
    assert!(Config::parse("not valid json5").is_err());
}
