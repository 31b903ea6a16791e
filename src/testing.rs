//! Deterministic stand-ins for the embedding model, the language model and tools

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::agent::llm::{LanguageModel, ModelResponse, ToolDeclaration, Turn};
use crate::agent::tools::{Caller, ToolHandler};
use crate::embeddings::Embedder;

pub(crate) const TEST_DIMENSION: usize = 8;

/// Bag-of-characters embedding: each char adds 1 to bucket `char % dimension`
#[derive(Debug)]
pub(crate) struct FakeEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for c in text.chars() {
            vector[c as usize % self.dimension] += 1.0;
        }
        vector
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new(TEST_DIMENSION)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Embedder whose model is always down
#[derive(Debug, Default)]
pub(crate) struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    async fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow::anyhow!("embedding model unavailable"))
    }
}

/// Replays queued responses and records every request it receives
#[derive(Debug, Default)]
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse, String>>>,
    requests: Mutex<Vec<(Vec<Turn>, Vec<ToolDeclaration>)>>,
}

impl ScriptedModel {
    pub(crate) fn new(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure after the responses already queued
    pub(crate) fn then_fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .expect("should lock responses")
            .push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn requests(&self) -> Vec<(Vec<Turn>, Vec<ToolDeclaration>)> {
        self.requests.lock().expect("should lock requests").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().expect("should lock requests").len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, turns: &[Turn], tools: &[ToolDeclaration]) -> Result<ModelResponse> {
        self.requests
            .lock()
            .expect("should lock requests")
            .push((turns.to_vec(), tools.to_vec()));

        let next = self
            .responses
            .lock()
            .expect("should lock responses")
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()));
        next.map_err(|message| anyhow::anyhow!(message))
    }
}

/// Returns a fixed value and counts its calls
#[derive(Debug)]
pub(crate) struct StaticTool {
    value: Value,
    calls: std::sync::Arc<AtomicUsize>,
}

impl StaticTool {
    pub(crate) fn new(value: Value) -> Self {
        Self {
            value,
            calls: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn counter(&self) -> std::sync::Arc<AtomicUsize> {
        std::sync::Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolHandler for StaticTool {
    async fn call(&self, _caller: &Caller, _args: &Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.clone())
    }
}

/// Always raises
#[derive(Debug, Default)]
pub(crate) struct FailingTool;

#[async_trait]
impl ToolHandler for FailingTool {
    async fn call(&self, _caller: &Caller, _args: &Value) -> Result<Value> {
        Err(anyhow::anyhow!("upstream API returned 403"))
    }
}
