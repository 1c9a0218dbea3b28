//! Configuration module for loading TOML config files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DebateError;
use crate::persona::{Persona, PersonaRegistry, default_personas};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub debate: DebateSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub personas: Vec<Persona>,
}

/// Which generation backend the personas talk to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Ollama's native `/api/generate` endpoint.
    Ollama,
    /// Any OpenAI-compatible chat completion endpoint.
    OpenAI,
}

/// Inference backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: Provider,
    pub api_base: String,
    /// Per-request timeout; one attempt only.
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
    /// Completion cap for the OpenAI provider.
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            api_base: "http://localhost:11434".to_string(),
            timeout_secs: 300,
            accept_invalid_certs: false,
            max_tokens: 512,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which embedder indexes and queries debate history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature-hashing embedder.
    Hashing,
    /// Ollama's `/api/embed` endpoint, using `backend.api_base`.
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            model: "all-minilm".to_string(),
            dimensions: 256,
        }
    }
}

/// Debate pacing and retrieval knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    /// Pause between consecutive personas within a phase.
    pub pacing_ms: u64,
    /// Nearest neighbours consulted per history query.
    pub history_results: usize,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            pacing_ms: 1000,
            history_results: 2,
        }
    }
}

impl DebateSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("app_data"),
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("debate.db")
    }

    pub fn transcript_dir(&self) -> PathBuf {
        self.data_dir.join("transcripts")
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(default_config())
        }
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, DebateError> {
        toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Write the configuration (including persona edits) back to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DebateError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DebateError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DebateError::ConfigError(format!("Failed to create config dir: {}", e))
                })?;
            }
        }

        fs::write(path.as_ref(), content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to write config: {}", e)))
    }

    /// Snapshot the configured personas as a validated registry.
    pub fn registry(&self) -> Result<PersonaRegistry, DebateError> {
        PersonaRegistry::new(self.personas.clone())
    }

    /// Replace the persona list with the registry's contents.
    pub fn set_registry(&mut self, registry: PersonaRegistry) {
        self.personas = registry.into_vec();
    }
}

/// Default configuration: local Ollama, offline embeddings, built-in panel.
pub fn default_config() -> Config {
    Config {
        backend: BackendConfig::default(),
        embedding: EmbeddingConfig::default(),
        debate: DebateSettings::default(),
        storage: StorageConfig::default(),
        personas: default_personas(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_str(
            r#"
            [[personas]]
            name = "Skeptic"
            model = "llama3:8b"

            [[personas]]
            name = "Optimist"
            model = "mistral"
            description = "You are an optimist."
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.provider, Provider::Ollama);
        assert_eq!(config.debate.history_results, 2);
        let registry = config.registry().unwrap();
        assert_eq!(registry.names(), vec!["Skeptic", "Optimist"]);
        assert_eq!(registry.get("Skeptic").unwrap().description, "");
    }

    #[test]
    fn test_parse_openai_backend() {
        let config = Config::from_str(
            r#"
            [backend]
            provider = "openai"
            api_base = "https://api.openai.com/v1"
            timeout_secs = 60

            [debate]
            pacing_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.provider, Provider::OpenAI);
        assert_eq!(config.backend.timeout(), Duration::from_secs(60));
        assert_eq!(config.backend.max_tokens, 512);
        assert_eq!(config.debate.pacing_ms, 0);
        assert_eq!(config.debate.history_results, 2);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let err = Config::from_str("[backend]\nprovider = \"carrier-pigeon\"").unwrap_err();
        assert!(matches!(err, DebateError::ConfigError(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.toml");

        let mut config = default_config();
        config.debate.pacing_ms = 0;
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.debate.pacing_ms, 0);
        assert_eq!(reloaded.personas, default_personas());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.personas.len(), 3);
    }
}
