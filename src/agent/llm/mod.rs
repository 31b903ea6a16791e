// Language model seam
// Provider-neutral turns, parts and responses, plus the trait the loop talks to


pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use gemini::GeminiClient;

/// Who produced a turn. Tool results travel back in `User` turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

impl Part {
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[inline]
    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self::FunctionCall(FunctionCall {
            name: name.into(),
            args,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    #[inline]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Tool output wrapped as `{"result": value}`, sent back on the user side
    #[inline]
    pub fn function_result(name: impl Into<String>, result: Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse(FunctionResponse {
                name: name.into(),
                response: serde_json::json!({ "result": result }),
            })],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other(String),
}

impl FinishReason {
    #[inline]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub parts: Vec<Part>,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub candidates: Vec<Candidate>,
}

impl ModelResponse {
    /// A single candidate carrying `parts`
    #[inline]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                parts,
                finish_reason: Some(FinishReason::Stop),
            }],
        }
    }
}

/// Machine-readable description of one callable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object
    pub parameters: Value,
}

/// A text generation model with function calling.
///
/// The model name is fixed when the client is built. Implementations make one
/// attempt per call.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, turns: &[Turn], tools: &[ToolDeclaration]) -> Result<ModelResponse>;
}
