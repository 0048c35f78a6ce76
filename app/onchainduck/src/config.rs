//! Configuration management for OnChainDuck

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ONCHAIN_URL: &str = "https://autonome.alt.technology/ducky-hzuj/chat";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram transport
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Completion model
    #[serde(default)]
    pub model: ModelConfig,

    /// On-chain action endpoint
    #[serde(default)]
    pub onchain: OnChainConfig,

    /// Persisted interaction log
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot token (can use env var syntax: ${VAR_NAME})
    pub bot_token: Option<String>,
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name: `openai` or `ollama`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub name: String,

    /// API key (can use env var syntax: ${VAR_NAME})
    pub api_key: Option<String>,

    /// Base URL for the API (optional)
    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnChainConfig {
    #[serde(default = "default_onchain_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// State file holding the interaction log
    #[serde(default = "default_memory_file")]
    pub file: PathBuf,

    /// Most recent records embedded in each prompt; `None` embeds the whole log
    #[serde(default = "default_context_window")]
    pub context_window: Option<usize>,
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::NotFound(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config: Config = serde_yaml::from_str(&content)?;

        config.expand_env_vars();

        Ok(config)
    }

    /// Load configuration with priority:
    /// 1. Project config (./.onchainduck/config.yaml)
    /// 2. User config (<config dir>/onchainduck/config.yaml)
    /// 3. Default configuration
    pub fn load() -> Result<Self> {
        let project_config = PathBuf::from("./.onchainduck/config.yaml");
        if project_config.exists() {
            return Self::load_from_file(&project_config);
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Location of the per-user config file
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut dir| {
            dir.push("onchainduck");
            dir.push("config.yaml");
            dir
        })
    }

    /// Defaults with the secrets pointing at their environment variables
    pub fn init_template() -> Self {
        let mut config = Self::default();
        config.telegram.bot_token = Some("${TELEGRAM_BOT_TOKEN}".to_string());
        config.model.api_key = Some("${OPENAI_API_KEY}".to_string());
        config
    }

    /// Expand `${VAR}` references in secret fields. An unset variable leaves
    /// the field empty so the accessor fallbacks still apply.
    fn expand_env_vars(&mut self) {
        expand_env_var(&mut self.telegram.bot_token);
        expand_env_var(&mut self.model.api_key);
    }

    /// Bot token from config, falling back to `TELEGRAM_BOT_TOKEN` then `BOT_TOKEN`
    pub fn bot_token(&self) -> Result<String> {
        self.telegram
            .bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("TELEGRAM_BOT_TOKEN").ok())
            .or_else(|| std::env::var("BOT_TOKEN").ok())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingField("telegram.bot_token".to_string()).into())
    }

    /// Model API key from config, falling back to the provider's env var
    pub fn api_key(&self) -> Option<String> {
        let env_var = match self.model.provider.as_str() {
            "ollama" => "OLLAMA_API_KEY",
            _ => "OPENAI_API_KEY",
        };
        self.model
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(env_var).ok())
            .filter(|k| !k.is_empty())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn expand_env_var(value: &mut Option<String>) {
    let Some(var_name) = value
        .as_deref()
        .and_then(|v| v.strip_prefix("${"))
        .and_then(|v| v.strip_suffix('}'))
        .map(str::to_string)
    else {
        return;
    };

    *value = std::env::var(&var_name).ok();
    if value.is_none() {
        tracing::debug!("Environment variable {} is not set", var_name);
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for OnChainConfig {
    fn default() -> Self {
        Self { url: default_onchain_url() }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            file: default_memory_file(),
            context_window: default_context_window(),
        }
    }
}

// Default value functions
fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    500
}

fn default_onchain_url() -> String {
    DEFAULT_ONCHAIN_URL.to_string()
}

fn default_memory_file() -> PathBuf {
    PathBuf::from("./memory.json")
}

fn default_context_window() -> Option<usize> {
    Some(20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.name, "gpt-4");
        assert_eq!(config.model.max_tokens, 500);
        assert_eq!(config.onchain.url, DEFAULT_ONCHAIN_URL);
        assert_eq!(config.memory.file, PathBuf::from("./memory.json"));
        assert_eq!(config.memory.context_window, Some(20));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
model:
  name: gpt-4o
memory:
  context_window: null
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.provider, "openai");
        assert!((config.model.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.memory.context_window, None);
        assert_eq!(config.onchain.url, DEFAULT_ONCHAIN_URL);
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("ONCHAINDUCK_TEST_TOKEN", "123:abc");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "telegram:\n  bot_token: ${ONCHAINDUCK_TEST_TOKEN}\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.bot_token().unwrap(), "123:abc");
    }

    #[test]
    fn test_missing_env_var_leaves_field_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "model:\n  api_key: ${ONCHAINDUCK_SURELY_UNSET_VAR}\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.model.api_key, None);
    }

    #[test]
    fn test_init_template_falls_back_to_bot_token_var() {
        std::env::remove_var("TELEGRAM_BOT_TOKEN");
        std::env::set_var("BOT_TOKEN", "123:abc");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        Config::init_template().save_to_file(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("${TELEGRAM_BOT_TOKEN}"));

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.telegram.bot_token, None);
        assert_eq!(config.bot_token().unwrap(), "123:abc");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.model.name, deserialized.model.name);
        assert_eq!(config.memory.file, deserialized.memory.file);
    }
}
