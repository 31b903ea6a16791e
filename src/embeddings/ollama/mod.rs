
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::embeddings::{Embedder, check_embeddings};

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Blocking Ollama client; async callers go through the `Embedder` impl
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.ollama.model.clone(),
            batch_size: config.ollama.batch_size,
            dimension: config.ollama.embedding_dimension as usize,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models().context("Server ping failed")?;

        if !models.iter().any(|m| model_matches(&m.name, &self.model)) {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            return Err(anyhow::anyhow!(
                "Model '{}' is not available. Available models: {:?}",
                self.model,
                available_models
            ));
        }

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .make_request(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate embeddings for multiple texts, `batch_size` inputs per request
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size.max(1) as usize) {
            let embeddings = self
                .generate_embeddings_single_batch(batch)
                .with_context(|| format!("Failed to process batch of {} texts", batch.len()))?;

            results.extend(embeddings);
        }

        check_embeddings(&results, texts.len(), self.dimension)?;

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn generate_embeddings_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embeddings")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            ));
        }

        Ok(response.embeddings)
    }

    /// Run one request. Failures are reported, never retried.
    fn make_request<F>(&self, request_fn: F) -> Result<String>
    where
        F: FnOnce() -> Result<String, ureq::Error>,
    {
        request_fn().map_err(|error| match error {
            ureq::Error::StatusCode(status) if status >= 500 => {
                warn!("Ollama server error (status {})", status);
                anyhow::anyhow!("Server error: HTTP {}", status)
            }
            ureq::Error::StatusCode(status) => {
                warn!("Ollama client error (status {})", status);
                anyhow::anyhow!("Client error: HTTP {}", status)
            }
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => {
                warn!("Transport error talking to {}: {}", self.base_url, error);
                anyhow::anyhow!("Transport error: {}", error)
            }
            other => anyhow::anyhow!("Request error: {}", other),
        })
    }
}

/// Ollama reports `name:tag`; a configured name without a tag means `latest`
fn model_matches(available: &str, configured: &str) -> bool {
    available == configured
        || (!configured.contains(':') && available == format!("{configured}:latest"))
}

#[async_trait]
impl Embedder for OllamaClient {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&texts))
            .await
            .context("Embedding task panicked")?
    }
}
