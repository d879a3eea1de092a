use super::data::{Config, ConfigKey};
use super::io::ConfigError;
use crate::core::modes::Mode;
use crate::core::session::Provider;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.provider().unwrap(), Provider::Cloud);
    assert_eq!(config.mode().unwrap(), Mode::Chat);
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set(ConfigKey::DefaultProvider, "Ollama").unwrap();
    config.set(ConfigKey::LocalModel, "mistral").unwrap();
    config.set(ConfigKey::DefaultMode, "CODE").unwrap();
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded.default_provider.as_deref(), Some("local"));
    assert_eq!(loaded.default_mode.as_deref(), Some("code"));
    assert_eq!(loaded.provider().unwrap(), Provider::Local);
    assert_eq!(loaded.mode().unwrap(), Mode::Code);

    let mut loaded = loaded;
    assert!(loaded.unset(ConfigKey::LocalModel));
    assert!(!loaded.unset(ConfigKey::LocalModel));
    loaded.save_to_path(&config_path).expect("second save failed");

    let reloaded = Config::load_from_path(&config_path).expect("reload failed");
    assert_eq!(reloaded.local_model, None);
    assert_eq!(reloaded.connection_defaults().local_model, "llama3");
}

#[test]
fn test_invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "default_provider = [").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at "));
}

#[test]
fn test_set_rejects_bad_values() {
    let mut config = Config::default();
    assert!(matches!(
        config.set(ConfigKey::DefaultMode, "poetry"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(config.set(ConfigKey::LocalUrl, "localhost:11434").is_err());
    assert!(config.set(ConfigKey::CloudModel, "  ").is_err());
    assert_eq!(config, Config::default());
}

#[test]
fn test_key_parsing_and_describe() {
    assert_eq!(
        "local_url".parse::<ConfigKey>().unwrap(),
        ConfigKey::LocalUrl
    );
    assert!(matches!(
        "theme".parse::<ConfigKey>(),
        Err(ConfigError::UnknownKey(_))
    ));

    let mut config = Config::default();
    config.set(ConfigKey::CloudModel, "gemini-2.5-pro").unwrap();
    let lines = config.describe();
    assert_eq!(lines.len(), 5);
    assert!(lines.contains(&"cloud-model = gemini-2.5-pro".to_string()));
    assert!(lines.contains(&"local-url = (unset)".to_string()));
}

#[test]
fn test_hand_edited_invalid_provider_is_reported() {
    let config = Config {
        default_provider: Some("openai".to_string()),
        ..Default::default()
    };
    assert!(config.provider().is_err());
}
