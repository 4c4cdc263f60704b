//! Configuration for the integration layer
//!
//! Provides centralized configuration for all components. Values come from a
//! TOML file, then environment variables, then command-line overrides.

use crate::llm::LlmConfig;
use crate::services::{ImageConfig, LookupConfig};
use crate::speech::{SpeechConfig, VoiceSettings};
use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_GEMINI_KEY: &str = "GEMINI_API_KEY";
pub const ENV_STABILITY_KEY: &str = "STABILITY_API_KEY";
pub const ENV_DATABASE: &str = "MURMUR_DB";

/// Where transcripts are persisted
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// SQLite file; persistence is disabled when absent
    pub database: Option<PathBuf>,
}

/// Voice input
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Shell command printing one recognized phrase to stdout
    pub command: Option<String>,
}

/// Speech worker timing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechTiming {
    pub poll_interval_ms: u64,
    pub pause_poll_ms: u64,
}

impl Default for SpeechTiming {
    fn default() -> Self {
        let defaults = SpeechConfig::default();
        Self {
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            pause_poll_ms: defaults.pause_poll.as_millis() as u64,
        }
    }
}

/// Configuration for the complete assistant
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub image: ImageConfig,
    pub lookup: LookupConfig,
    pub persistence: PersistenceConfig,
    pub voice: VoiceSettings,
    pub capture: CaptureConfig,
    pub speech: SpeechTiming,

    /// Print speech instead of vocalizing it
    pub text_only: bool,
}

impl AssistantConfig {
    /// Default location: `<config dir>/murmur/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("murmur").join("config.toml"))
    }

    /// Load from `path`, or from the default location if it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MurmurError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MurmurError::ConfigError(format!("invalid configuration: {}", e)))
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn with_env_from<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_GEMINI_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = non_empty(ENV_STABILITY_KEY) {
            self.image.api_key = Some(key);
        }
        if let Some(path) = non_empty(ENV_DATABASE) {
            self.persistence.database = Some(PathBuf::from(path));
        }
        self
    }

    /// Persist transcripts to `path`
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence.database = Some(path.into());
        self
    }

    /// Print speech instead of vocalizing it
    pub fn with_text_only(mut self, text_only: bool) -> Self {
        self.text_only = text_only;
        self
    }

    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig::default()
            .with_poll_interval(Duration::from_millis(self.speech.poll_interval_ms.max(1)))
            .with_pause_poll(Duration::from_millis(self.speech.pause_poll_ms.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert!(config.llm.api_key.is_none());
        assert!(config.persistence.database.is_none());
        assert!(config.capture.command.is_none());
        assert_eq!(config.lookup.sentences, 2);
        assert_eq!(config.speech.poll_interval_ms, 500);
        assert_eq!(config.speech_config().pause_poll, Duration::from_millis(100));
    }

    #[test]
    fn test_partial_toml() {
        let config = AssistantConfig::from_toml(
            r#"
            text_only = true

            [llm]
            api_key = "abc"

            [voice]
            rate = 200

            [persistence]
            database = "/tmp/murmur.db"
            "#,
        )
        .unwrap();

        assert!(config.text_only);
        assert_eq!(config.llm.api_key.as_deref(), Some("abc"));
        assert_eq!(config.llm.model, "gemini-1.5-flash-001");
        assert_eq!(config.voice.rate, 200);
        assert_eq!(config.voice.program, "espeak-ng");
        assert_eq!(config.persistence.database, Some(PathBuf::from("/tmp/murmur.db")));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AssistantConfig::from_toml("llm = 5"),
            Err(MurmurError::ConfigError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_GEMINI_KEY, "gem"),
            (ENV_STABILITY_KEY, "   "),
            (ENV_DATABASE, "/data/m.db"),
        ]
        .into_iter()
        .collect();

        let config = AssistantConfig::default()
            .with_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("gem"));
        assert!(config.image.api_key.is_none());
        assert_eq!(config.persistence.database, Some(PathBuf::from("/data/m.db")));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[capture]\ncommand = \"echo hi\"\n").unwrap();

        let config = AssistantConfig::load(Some(&path)).unwrap();
        assert_eq!(config.capture.command.as_deref(), Some("echo hi"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(AssistantConfig::load(Some(Path::new("/no/such/murmur.toml"))).is_err());
    }
}
