
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{
    Candidate, FinishReason, FunctionCall, FunctionResponse, LanguageModel, ModelResponse, Part,
    Role, ToolDeclaration, Turn,
};
use crate::config::Config;

/// Blocking client for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: Url,
    api_version: String,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<GenerateContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerateContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    #[serde(default)]
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDecl>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDecl {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateCandidate {
    content: Option<GenerateContent>,
    finish_reason: Option<String>,
}

impl GeminiClient {
    /// Build a client from the `[llm]` section; fails without an API key
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.llm_api_key().ok_or_else(|| {
            anyhow::anyhow!(
                "No Gemini API key configured; set {} or llm.api_key",
                crate::config::API_KEY_ENV_VAR
            )
        })?;

        let base_url = config
            .llm
            .base_url()
            .context("Failed to parse Gemini base URL")?;

        Ok(Self {
            base_url,
            api_version: config.llm.api_version.clone(),
            model: config.llm.model.clone(),
            api_key,
            agent: build_agent(Duration::from_secs(config.llm.timeout_seconds)),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<Url> {
        let version = self.api_version.trim_matches('/');
        let joined = format!("{version}/models/{}:generateContent", self.model);
        let mut url = self
            .base_url
            .join(&joined)
            .context("Failed to build Gemini endpoint")?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    /// One blocking round trip
    #[inline]
    pub fn generate_blocking(
        &self,
        turns: &[Turn],
        tools: &[ToolDeclaration],
    ) -> Result<ModelResponse> {
        let request = build_request(turns, tools);
        let body = serde_json::to_string(&request).context("Failed to serialize Gemini request")?;
        let url = self.endpoint()?;

        debug!(
            "Sending {} turns and {} tools to {}",
            turns.len(),
            tools.len(),
            self.model
        );

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&body)
            .map_err(|e| {
                warn!("Gemini transport error: {}", e);
                anyhow::anyhow!("Gemini request failed: {}", e)
            })?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read Gemini response body")?;

        if !status.is_success() {
            warn!("Gemini returned HTTP {}", status.as_u16());
            return Err(anyhow::anyhow!(
                "Gemini returned HTTP {}: {}",
                status.as_u16(),
                text.chars().take(500).collect::<String>()
            ));
        }

        let payload: GenerateContentResponse =
            serde_json::from_str(&text).context("Failed to parse Gemini response")?;
        Ok(into_model_response(payload))
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, turns: &[Turn], tools: &[ToolDeclaration]) -> Result<ModelResponse> {
        let client = self.clone();
        let turns = turns.to_vec();
        let tools = tools.to_vec();
        tokio::task::spawn_blocking(move || client.generate_blocking(&turns, &tools))
            .await
            .context("Gemini task panicked")?
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn build_request(turns: &[Turn], tools: &[ToolDeclaration]) -> GenerateContentRequest {
    let contents = turns
        .iter()
        .map(|turn| GenerateContent {
            role: Some(
                match turn.role {
                    Role::User => "user",
                    Role::Model => "model",
                }
                .to_string(),
            ),
            parts: turn.parts.iter().map(to_wire_part).collect(),
        })
        .collect();

    let tools = (!tools.is_empty()).then(|| {
        vec![GeminiTool {
            function_declarations: tools
                .iter()
                .map(|tool| GeminiFunctionDecl {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                })
                .collect(),
        }]
    });

    GenerateContentRequest { contents, tools }
}

fn to_wire_part(part: &Part) -> ContentPart {
    match part {
        Part::Text(text) => ContentPart {
            text: Some(text.clone()),
            ..ContentPart::default()
        },
        Part::FunctionCall(call) => ContentPart {
            function_call: Some(WireFunctionCall {
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            ..ContentPart::default()
        },
        Part::FunctionResponse(response) => ContentPart {
            function_response: Some(WireFunctionResponse {
                name: response.name.clone(),
                response: response.response.clone(),
            }),
            ..ContentPart::default()
        },
    }
}

fn into_model_response(payload: GenerateContentResponse) -> ModelResponse {
    let candidates = payload
        .candidates
        .into_iter()
        .map(|candidate| {
            let parts = candidate
                .content
                .map(|content| content.parts)
                .unwrap_or_default()
                .into_iter()
                .flat_map(from_wire_part)
                .collect();

            Candidate {
                parts,
                finish_reason: candidate.finish_reason.as_deref().map(FinishReason::from_wire),
            }
        })
        .collect();

    ModelResponse { candidates }
}

/// A wire part may carry several fields at once
fn from_wire_part(part: ContentPart) -> Vec<Part> {
    let mut parts = Vec::new();
    if let Some(call) = part.function_call {
        parts.push(Part::FunctionCall(FunctionCall {
            name: call.name,
            args: call.args,
        }));
    }
    if let Some(response) = part.function_response {
        parts.push(Part::FunctionResponse(FunctionResponse {
            name: response.name,
            response: response.response,
        }));
    }
    if let Some(text) = part.text {
        parts.push(Part::Text(text));
    }
    parts
}
