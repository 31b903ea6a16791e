// Configuration management module
// TOML settings for the embedding provider, the generation model, chunking and the agent loop

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_ENV_VAR, AgentConfig, Config, ConfigError, LlmConfig, OllamaConfig, RetrievalConfig,
    MAX_AGENT_ITERATIONS,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
