#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, LlmConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Docent Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    eprintln!();
    eprintln!("{}", style("Generation Model Configuration").bold().yellow());
    eprintln!(
        "The API key is read from ${} when set, otherwise from the config file.",
        super::settings::API_KEY_ENV_VAR
    );
    eprintln!();

    configure_llm(&mut config.llm)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Generation Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.llm.base_url).cyan());
    eprintln!("  API Version: {}", style(&config.llm.api_version).cyan());
    eprintln!("  Model: {}", style(&config.llm.model).cyan());
    eprintln!("  Timeout: {}s", style(config.llm.timeout_seconds).cyan());
    eprintln!(
        "  API Key: {}",
        style(masked_key(config.llm_api_key().as_deref())).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!(
        "  Document chunks: {} / overlap {}",
        style(config.chunking.document.size).cyan(),
        style(config.chunking.document.overlap).cyan()
    );
    eprintln!(
        "  Folder file chunks: {} / overlap {}",
        style(config.chunking.folder_file.size).cyan(),
        style(config.chunking.folder_file.overlap).cyan()
    );
    eprintln!("  Default k: {}", style(config.retrieval.default_k).cyan());
    eprintln!(
        "  Query expansion: {}",
        style(config.retrieval.query_expansion).cyan()
    );
    eprintln!(
        "  Max agent iterations: {}",
        style(config.agent.max_iterations).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let config_dir = Config::config_dir().context("Failed to determine config directory")?;
    Config::load(&config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.clone(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension produced by the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(embedding_dimension)?;

    Ok(())
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Generation API base URL")
        .default(llm.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = LlmConfig {
                base_url: input.clone(),
                ..llm.clone()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Generation model")
        .default(llm.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout in seconds")
        .default(llm.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=600).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 600 seconds")
            }
        })
        .interact_text()?;

    let api_key: String = Input::new()
        .with_prompt("API key (leave empty to use the environment)")
        .allow_empty(true)
        .default(llm.api_key.clone().unwrap_or_default())
        .show_default(false)
        .interact_text()?;

    llm.set_base_url(base_url)?;
    llm.set_model(model)?;
    llm.set_timeout_seconds(timeout_seconds)?;
    llm.api_key = Some(api_key).filter(|key| !key.trim().is_empty());

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}

fn masked_key(key: Option<&str>) -> String {
    let Some(key) = key else {
        return "not set".to_string();
    };

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
