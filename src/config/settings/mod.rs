
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::{ChunkingConfig, ChunkingPolicy};
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Hard ceiling for the agent loop; configuration may only lower it.
pub const MAX_AGENT_ITERATIONS: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Settings for the generation model behind the agent loop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_version: String,
    pub model: String,
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            api_version: "v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 120,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub query_expansion: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 12,
            query_expansion: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_AGENT_ITERATIONS,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid {policy} chunk size: {size} (must be greater than 0)")]
    InvalidChunkSize { policy: &'static str, size: usize },
    #[error("Invalid {policy} chunk overlap: {overlap} (must be smaller than chunk size {size})")]
    InvalidChunkOverlap {
        policy: &'static str,
        overlap: usize,
        size: usize,
    },
    #[error("Invalid API version: {0} (cannot be empty or contain '/')")]
    InvalidApiVersion(String),
    #[error("Invalid request timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retrieval k: {0} (must be between 1 and 100)")]
    InvalidRetrievalK(usize),
    #[error("Invalid max iterations: {0} (must be between 1 and 10)")]
    InvalidMaxIterations(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default location of the configuration and data directory
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".docent"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("docent"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load(config_dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.llm.validate()?;
        validate_policy("document", &self.chunking.document)?;
        validate_policy("folder_file", &self.chunking.folder_file)?;

        if !(1..=100).contains(&self.retrieval.default_k) {
            return Err(ConfigError::InvalidRetrievalK(self.retrieval.default_k));
        }

        if !(1..=MAX_AGENT_ITERATIONS).contains(&self.agent.max_iterations) {
            return Err(ConfigError::InvalidMaxIterations(self.agent.max_iterations));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }

    /// API key for the generation model; the environment wins over the file
    #[inline]
    pub fn llm_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.llm.api_key.clone())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the SQLite database
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.get_base_dir().join("metadata.db")
    }

    /// Directory holding the binary vector files of every collection
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vector_dbs")
    }

    /// Directory holding per-tenant metadata logs
    #[inline]
    pub fn users_path(&self) -> PathBuf {
        self.get_base_dir().join("users")
    }

    #[inline]
    pub fn chat_history_path(&self) -> PathBuf {
        self.get_base_dir().join("chat_histories")
    }
}

fn validate_policy(name: &'static str, policy: &ChunkingPolicy) -> Result<(), ConfigError> {
    if policy.size == 0 {
        return Err(ConfigError::InvalidChunkSize {
            policy: name,
            size: policy.size,
        });
    }

    if policy.overlap >= policy.size {
        return Err(ConfigError::InvalidChunkOverlap {
            policy: name,
            overlap: policy.overlap,
            size: policy.size,
        });
    }

    Ok(())
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        let version = self.api_version.trim();
        if version.is_empty() || version.contains('/') {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Base URL normalized to end with a slash so relative joins keep its path
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        let temp_config = LlmConfig {
            base_url: base_url.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=600).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}
