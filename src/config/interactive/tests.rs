use super::load_existing_config as load_existing_config_impl;
use super::*;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
fn load_existing_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut saved = load_existing_config_impl(temp_dir.path());
    saved.ollama.host = "gpu-box".to_string();
    saved.save().expect("should save config");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.ollama.host, "gpu-box");
}

#[test]
fn load_existing_config_ignores_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[ollama]\nport = 0\n")
        .expect("should write config");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.ollama.port, 11434);
}

#[test]
fn model_names_must_not_be_blank() {
    assert!(non_empty(&"llama3.1:8b".to_string()).is_ok());
    assert!(non_empty(&"   ".to_string()).is_err());
}

#[test]
fn unreachable_server_fails_connection_test() {
    let config = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        ..OllamaConfig::default()
    };
    assert!(!test_ollama_connection(&config));
}
