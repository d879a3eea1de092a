//! Process-wide connection settings and the cached cloud session handle.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use super::providers::cloud::{CloudCapability, CloudSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Cloud,
    Local,
}

impl Provider {
    /// Identifier used on the command line and in the config file.
    pub fn id(self) -> &'static str {
        match self {
            Provider::Cloud => "gemini",
            Provider::Local => "local",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provider::Cloud => "GEMINI",
            Provider::Local => "LOCAL",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "cloud" => Ok(Provider::Cloud),
            "local" | "ollama" => Ok(Provider::Local),
            other => Err(format!("unknown provider: {other} (expected gemini or local)")),
        }
    }
}

/// Connection settings shared by every turn.
///
/// Each mutator drops the cached cloud session, even when the value does not
/// change, so the next cloud turn always starts a fresh session.
#[derive(Debug)]
pub struct SessionConfig {
    provider: Provider,
    model: String,
    endpoint_url: String,
    system_instruction: String,
    cached_session: Option<Arc<CloudSession>>,
}

impl SessionConfig {
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        endpoint_url: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            endpoint_url: endpoint_url.into(),
            system_instruction: system_instruction.into(),
            cached_session: None,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn cached_session(&self) -> Option<&Arc<CloudSession>> {
        self.cached_session.as_ref()
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
        self.invalidate_session();
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        self.invalidate_session();
    }

    pub fn set_endpoint(&mut self, endpoint_url: impl Into<String>) {
        self.endpoint_url = endpoint_url.into();
        self.invalidate_session();
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.system_instruction = instruction.into();
        self.invalidate_session();
    }

    /// Drop the cached handle. Streams that already hold a clone keep it.
    pub fn invalidate_session(&mut self) {
        if let Some(session) = self.cached_session.take() {
            debug!(session = session.id(), "invalidated cloud session");
        }
    }

    /// The cached cloud session, created from the current model and
    /// instruction when none exists.
    pub fn cloud_session(&mut self) -> Arc<CloudSession> {
        let session = self.cached_session.get_or_insert_with(|| {
            CloudSession::create(
                &self.model,
                &self.system_instruction,
                &[CloudCapability::SearchGrounding],
            )
        });
        Arc::clone(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new(Provider::Cloud, "m", "http://localhost:11434", "inst")
    }

    #[test]
    fn session_is_reused_until_invalidated() {
        let mut config = config();
        let first = config.cloud_session();
        let again = config.cloud_session();
        assert_eq!(first.id(), again.id());
        assert_eq!(first.model(), "m");
        assert_eq!(first.system_instruction(), "inst");
        assert_eq!(first.capabilities(), &[CloudCapability::SearchGrounding]);
    }

    #[test]
    fn every_mutator_invalidates_even_without_change() {
        let mut config = config();
        let mutators: Vec<fn(&mut SessionConfig)> = vec![
            |c| c.set_provider(Provider::Cloud),
            |c| c.set_model("m"),
            |c| c.set_endpoint("http://localhost:11434"),
            |c| c.set_instruction("inst"),
        ];
        for mutate in mutators {
            let before = config.cloud_session().id();
            mutate(&mut config);
            assert!(config.cached_session().is_none());
            assert_ne!(config.cloud_session().id(), before);
        }
    }

    #[test]
    fn captured_handle_survives_invalidation() {
        let mut config = config();
        let captured = config.cloud_session();
        config.set_model("other");
        assert_eq!(captured.model(), "m");
        assert_eq!(config.cloud_session().model(), "other");
    }

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("Gemini".parse::<Provider>(), Ok(Provider::Cloud));
        assert_eq!("local".parse::<Provider>(), Ok(Provider::Local));
        assert!("openai".parse::<Provider>().is_err());
    }
}
