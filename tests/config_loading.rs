//! Integration tests for loading configuration from disk
//!
//! Covers the template written by the `config` subcommand, error context for
//! unreadable and malformed files, and validation failures carrying the path.

use provider_bridge::cli::generate_config_template;
use provider_bridge::config::Config;
use provider_bridge::error::AppError;
use provider_bridge::router::RoutingMode;
use std::error::Error;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

#[test]
fn test_written_template_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, generate_config_template());

    let config = Config::from_file(&path).expect("template should load");
    assert_eq!(config.routing.mode, RoutingMode::Adaptive);
    assert_eq!(config.routing.anthropic_provider, "claude");
    assert!(config.provider("llama").is_some());
    assert!(config.routing.category("coding").is_some());
    assert!(!config.distributor.enabled);
}

#[test]
fn test_missing_file_keeps_io_source() {
    let err = Config::from_file("/nonexistent/bridge/config.toml").unwrap_err();
    assert!(matches!(err, AppError::ConfigFileRead { .. }));
    assert!(err.to_string().contains("/nonexistent/bridge/config.toml"));
    assert!(err.source().is_some_and(|s| s.is::<std::io::Error>()));
}

#[test]
fn test_malformed_file_keeps_toml_source() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[server\nhost = ");

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    assert!(err.source().is_some_and(|s| s.is::<toml::de::Error>()));
}

#[test]
fn test_validation_failure_names_file_and_reason() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[server]
host = "127.0.0.1"
port = 7010

[routing]
anthropic_provider = "claude"

[[providers]]
id = "openai"
type = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
"#,
    );

    let err = Config::from_file(&path).unwrap_err();
    match err {
        AppError::ConfigValidationFailed { path: p, reason } => {
            assert_eq!(p, path.display().to_string());
            assert!(reason.contains("anthropic_provider"), "{reason}");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn test_unknown_provider_type_loads_with_warning() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[server]
host = "127.0.0.1"
port = 7010

[routing]
anthropic_provider = "grok"

[[providers]]
id = "grok"
type = "xai"
base_url = "https://api.x.ai/v1"
model = "grok-2"
"#,
    );

    let config = Config::from_file(&path).expect("unsupported type is not fatal at load");
    assert_eq!(config.provider("grok").map(|p| p.kind()), Some("xai"));
}
