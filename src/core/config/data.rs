use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::io::ConfigError;
use crate::core::app::ConnectionDefaults;
use crate::core::constants::{DEFAULT_CLOUD_MODEL, DEFAULT_LOCAL_MODEL, DEFAULT_LOCAL_URL};
use crate::core::modes::{find_mode, Mode};
use crate::core::session::Provider;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Provider used at startup: "gemini" or "local"
    pub default_provider: Option<String>,
    pub cloud_model: Option<String>,
    pub local_model: Option<String>,
    /// Base URL of the Ollama-compatible server
    pub local_url: Option<String>,
    /// Mode active at startup (chat, code, explain, doc, design)
    pub default_mode: Option<String>,
}

/// Keys accepted by `neuralterm set` / `neuralterm unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DefaultProvider,
    CloudModel,
    LocalModel,
    LocalUrl,
    DefaultMode,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::DefaultProvider,
        ConfigKey::CloudModel,
        ConfigKey::LocalModel,
        ConfigKey::LocalUrl,
        ConfigKey::DefaultMode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::DefaultProvider => "default-provider",
            ConfigKey::CloudModel => "cloud-model",
            ConfigKey::LocalModel => "local-model",
            ConfigKey::LocalUrl => "local-url",
            ConfigKey::DefaultMode => "default-mode",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace('_', "-").to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownKey(value.to_string()))
    }
}

impl Config {
    fn slot_mut(&mut self, key: ConfigKey) -> &mut Option<String> {
        match key {
            ConfigKey::DefaultProvider => &mut self.default_provider,
            ConfigKey::CloudModel => &mut self.cloud_model,
            ConfigKey::LocalModel => &mut self.local_model,
            ConfigKey::LocalUrl => &mut self.local_url,
            ConfigKey::DefaultMode => &mut self.default_mode,
        }
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::DefaultProvider => self.default_provider.as_deref(),
            ConfigKey::CloudModel => self.cloud_model.as_deref(),
            ConfigKey::LocalModel => self.local_model.as_deref(),
            ConfigKey::LocalUrl => self.local_url.as_deref(),
            ConfigKey::DefaultMode => self.default_mode.as_deref(),
        }
    }

    /// Validate and store a value. Providers and modes are stored in their
    /// canonical spelling.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::invalid(key, value, "value must not be empty"));
        }
        let stored = match key {
            ConfigKey::DefaultProvider => value
                .parse::<Provider>()
                .map_err(|reason| ConfigError::invalid(key, value, reason))?
                .id()
                .to_string(),
            ConfigKey::DefaultMode => find_mode(value)
                .ok_or_else(|| ConfigError::invalid(key, value, "unknown mode"))?
                .id
                .to_string(),
            ConfigKey::LocalUrl
                if !(value.starts_with("http://") || value.starts_with("https://")) =>
            {
                return Err(ConfigError::invalid(
                    key,
                    value,
                    "expected an http:// or https:// URL",
                ));
            }
            _ => value.to_string(),
        };
        *self.slot_mut(key) = Some(stored);
        Ok(())
    }

    /// Returns true when a value was present.
    pub fn unset(&mut self, key: ConfigKey) -> bool {
        self.slot_mut(key).take().is_some()
    }

    pub fn provider(&self) -> Result<Provider, ConfigError> {
        match self.default_provider.as_deref() {
            None => Ok(Provider::Cloud),
            Some(value) => value.parse().map_err(|reason: String| {
                ConfigError::invalid(ConfigKey::DefaultProvider, value, reason)
            }),
        }
    }

    pub fn mode(&self) -> Result<Mode, ConfigError> {
        match self.default_mode.as_deref() {
            None => Ok(Mode::Chat),
            Some(value) => find_mode(value)
                .map(|spec| spec.mode)
                .ok_or_else(|| ConfigError::invalid(ConfigKey::DefaultMode, value, "unknown mode")),
        }
    }

    pub fn connection_defaults(&self) -> ConnectionDefaults {
        ConnectionDefaults {
            cloud_model: self
                .cloud_model
                .clone()
                .unwrap_or_else(|| DEFAULT_CLOUD_MODEL.to_string()),
            local_model: self
                .local_model
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            local_url: self
                .local_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string()),
        }
    }

    /// One `key = value` line per key, `(unset)` for missing values.
    pub fn describe(&self) -> Vec<String> {
        ConfigKey::ALL
            .into_iter()
            .map(|key| format!("{key} = {}", self.get(key).unwrap_or("(unset)")))
            .collect()
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
