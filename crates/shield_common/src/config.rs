//! Shield configuration.
//!
//! Config file: ~/.config/shield/config.toml or /etc/shield/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shield_shared::error::{ShieldError, ShieldResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `generation.api_key`
pub const API_KEY_ENV: &str = "SHIELD_API_KEY";

/// Generation service wire style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `generateContent` with a response schema
    #[default]
    Gemini,
    /// `/api/generate` with `format: json`
    Ollama,
    /// `/v1/chat/completions` with a JSON response format
    OpenAi,
}

impl std::str::FromStr for Backend {
    type Err = ShieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Backend::Gemini),
            "ollama" => Ok(Backend::Ollama),
            "openai" | "open-ai" | "openai-compatible" => Ok(Backend::OpenAi),
            _ => Err(ShieldError::Input(format!(
                "Invalid backend: '{}'. Valid values: gemini, ollama, openai",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub enabled: bool,
    pub backend: Backend,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    /// Extra attempts after a network failure; parse and schema errors never retry
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: Backend::Gemini,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash-preview-05-20".to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: 0.2,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff before retry `attempt` (1-based); grows linearly
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealSettings {
    pub delay_ms: u64,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self { delay_ms: 750 }
    }
}

impl RevealSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Archive database; defaults to the user data dir
    pub path: Option<PathBuf>,
}

impl StoreSettings {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => p.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("shield")
                .join("reports.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// TOML file of `[[section]]` tables
    pub path: Option<PathBuf>,
}

/// Main Shield configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShieldConfig {
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub reveal: RevealSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub corpus: CorpusSettings,
}

impl ShieldConfig {
    /// Get default user config path: ~/.config/shield/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(config_dir.join("shield").join("config.toml"))
    }

    /// Get system config path: /etc/shield/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/shield/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/shield/config.toml)
    /// 3. System config (/etc/shield/config.toml)
    /// 4. Defaults
    ///
    /// `SHIELD_API_KEY` then overrides the api key.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => Self::load_default_locations()?,
        };
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.generation.api_key = Some(key);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn load_default_locations() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_file(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_file(&system_path);
        }

        Ok(Self::default())
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: ShieldConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Reject settings that would make every generation fail
    pub fn validate(&self) -> ShieldResult<()> {
        let g = &self.generation;
        if g.timeout_secs == 0 {
            return Err(ShieldError::Input(
                "generation.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(ShieldError::Input(format!(
                "generation.temperature must be between 0 and 2 (got {})",
                g.temperature
            )));
        }
        if g.endpoint.trim().is_empty() {
            return Err(ShieldError::Input(
                "generation.endpoint must not be empty".to_string(),
            ));
        }
        if g.model.trim().is_empty() {
            return Err(ShieldError::Input(
                "generation.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::user_config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShieldConfig::default();
        assert_eq!(config.generation.backend, Backend::Gemini);
        assert_eq!(config.generation.max_retries, 0);
        assert_eq!(config.reveal.delay_ms, 750);
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ShieldConfig::from_toml(
            r#"
            [generation]
            backend = "ollama"
            endpoint = "http://localhost:11434"
            model = "llama3.2:3b"

            [reveal]
            delay_ms = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.backend, Backend::Ollama);
        assert_eq!(config.generation.timeout_secs, 60);
        assert_eq!(config.reveal.delay(), Duration::from_millis(100));
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ShieldConfig::default();
        config.generation.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ShieldError::Input(_))));

        let mut config = ShieldConfig::default();
        config.generation.temperature = 3.5;
        assert!(matches!(config.validate(), Err(ShieldError::Input(_))));
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shield.toml");
        fs::write(&path, "[generation]\nmax_retries = 2\nretry_backoff_ms = 50\n").unwrap();
        let config = ShieldConfig::load_file(&path).unwrap();
        assert_eq!(config.generation.max_retries, 2);
        assert_eq!(config.generation.backoff(2), Duration::from_millis(100));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ShieldConfig::load_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("OpenAI".parse::<Backend>().unwrap(), Backend::OpenAi);
        assert!("bard".parse::<Backend>().is_err());
    }
}
