// Agent module
// The tool-calling loop that turns a question, its context and its history into one answer

pub mod errors;
pub mod llm;
pub mod prompt;
pub mod tools;


use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::chat::{ConversationError, ConversationStore, Role as MessageRole};
use crate::config::{Config, MAX_AGENT_ITERATIONS};
use crate::database::ScopeKey;
use crate::retrieval::Retriever;

pub use errors::AgentError;
pub use llm::{
    Candidate, FinishReason, FunctionCall, LanguageModel, ModelResponse, Part, Role, ToolDeclaration,
    Turn,
};
pub use prompt::{CONTINUE_NUDGE, DEFAULT_SYSTEM_PROMPT, PromptParts};
pub use tools::{Caller, ToolHandler, ToolKind, ToolRegistry};

pub const ERROR_ANSWER: &str = "An error occurred while generating the response.";
pub const COMPLETED_FALLBACK: &str = "I have successfully completed your request. All the requested \
tasks have been processed and the results are ready for your use.";
pub const NOT_FOUND_FALLBACK: &str = "I couldn't find a result for your request.";

/// How a loop run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model answered with text and no tool call
    TextDone,
    /// No candidates, or neither text nor tool calls
    NoProgress,
    /// The iteration cap was hit while tool calls kept coming
    CapReached,
    /// A model call failed
    Failed,
}

enum LoopState {
    AwaitModel,
    ToolPending,
    TextDone(String),
    NoProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub answer: String,
    pub termination: Termination,
    pub iterations: u32,
    /// Function-response turns appended during the run
    pub tool_results: usize,
}

/// Tunables for one orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub max_iterations: u32,
    pub system_prompt: String,
    pub default_k: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: MAX_AGENT_ITERATIONS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            default_k: 12,
        }
    }
}

impl AgentSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.agent.max_iterations.clamp(1, MAX_AGENT_ITERATIONS),
            system_prompt: config
                .agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            default_k: config.retrieval.default_k,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    pub chat_id: Option<String>,
    /// Identity tools act for; without it no tools are offered
    pub caller: Option<Caller>,
    /// Folder scopes to search; empty means the global collection
    pub scopes: Vec<ScopeKey>,
    pub k: Option<usize>,
}

impl ChatRequest {
    #[inline]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub chat_id: String,
    pub answer: String,
    pub context: Vec<String>,
    pub termination: Termination,
    pub iterations: u32,
}

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    retriever: Retriever,
    store: ConversationStore,
    settings: AgentSettings,
}

impl Orchestrator {
    #[inline]
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        retriever: Retriever,
        store: ConversationStore,
    ) -> Self {
        Self {
            model,
            tools,
            retriever,
            store,
            settings: AgentSettings::default(),
        }
    }

    #[inline]
    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    #[inline]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Answer one question and record the exchange in its chat.
    ///
    /// Retrieval failures only cost context. Model failures become a generic
    /// answer. Store failures and an empty query are errors.
    #[inline]
    pub async fn respond(&self, request: ChatRequest) -> Result<ChatReply> {
        if request.query.trim().is_empty() {
            return Err(ConversationError::EmptyMessage.into());
        }

        let history = match request.chat_id.as_deref() {
            Some(chat_id) => self.store.get(chat_id)?,
            None => Vec::new(),
        };

        let k = request.k.unwrap_or(self.settings.default_k);
        let context = match self
            .retriever
            .retrieve(&request.query, k, &request.scopes)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!("Retrieval failed, answering without context: {:#}", e);
                Vec::new()
            }
        };

        let caller = request.caller.as_ref();
        let declarations = match caller {
            Some(_) => self.tools.declarations(),
            None => Vec::new(),
        };
        let composed = prompt::compose(&PromptParts {
            system_prompt: &self.settings.system_prompt,
            query: &request.query,
            context: &context,
            caller,
            tools: &declarations,
        });

        let mut turns = prompt::history_turns(&history);
        turns.push(Turn::user(composed));
        let outcome = self.run_loop(turns, caller).await;

        let chat_id = self
            .store
            .append(request.chat_id.as_deref(), MessageRole::User, &request.query)?;
        self.store
            .append(Some(&chat_id), MessageRole::Assistant, &outcome.answer)?;

        info!(
            "Answered in chat {} after {} iterations ({:?})",
            chat_id, outcome.iterations, outcome.termination
        );
        Ok(ChatReply {
            chat_id,
            answer: outcome.answer,
            context,
            termination: outcome.termination,
            iterations: outcome.iterations,
        })
    }

    /// Drive the model until it answers with text, stalls, fails or runs out
    /// of iterations.
    ///
    /// Tools are offered only when a caller is present. Each response's own
    /// turn is appended before its tool results, and results keep the order
    /// the model asked for them in.
    #[inline]
    pub async fn run_loop(&self, mut turns: Vec<Turn>, caller: Option<&Caller>) -> LoopOutcome {
        let declarations = match caller {
            Some(_) => self.tools.declarations(),
            None => Vec::new(),
        };

        // Settings are public, so the hard bound is applied again here
        let cap = self.settings.max_iterations.clamp(1, MAX_AGENT_ITERATIONS);
        let mut state = LoopState::AwaitModel;
        let mut iterations = 0;
        let mut tool_turns = 0_u32;
        let mut tool_results = 0_usize;
        let mut latest_text: Option<String> = None;

        loop {
            state = match state {
                LoopState::AwaitModel => {
                    if iterations >= cap {
                        warn!("Agent loop hit the cap of {} iterations", iterations);
                        return LoopOutcome {
                            answer: fallback(latest_text, tool_results),
                            termination: Termination::CapReached,
                            iterations,
                            tool_results,
                        };
                    }
                    iterations += 1;

                    let response = match self.model.generate(&turns, &declarations).await {
                        Ok(response) => response,
                        Err(e) => {
                            error!("Model call failed at iteration {}: {:#}", iterations, e);
                            return LoopOutcome {
                                answer: ERROR_ANSWER.to_string(),
                                termination: Termination::Failed,
                                iterations,
                                tool_results,
                            };
                        }
                    };

                    match response.candidates.into_iter().next() {
                        None => LoopState::NoProgress,
                        Some(candidate) => {
                            let (calls, text) = split_parts(&candidate.parts);
                            if !text.trim().is_empty() {
                                latest_text = Some(text.clone());
                            }

                            if calls.is_empty() {
                                if text.trim().is_empty() {
                                    LoopState::NoProgress
                                } else {
                                    LoopState::TextDone(text)
                                }
                            } else {
                                turns.push(Turn {
                                    role: Role::Model,
                                    parts: candidate.parts.clone(),
                                });
                                for call in calls {
                                    if let Some(turn) = self.dispatch(call, caller).await {
                                        turns.push(turn);
                                        tool_results += 1;
                                    }
                                }
                                tool_turns += 1;
                                LoopState::ToolPending
                            }
                        }
                    }
                }
                LoopState::ToolPending => {
                    if tool_turns > 1 {
                        turns.push(Turn::user(CONTINUE_NUDGE));
                    }
                    LoopState::AwaitModel
                }
                LoopState::TextDone(answer) => {
                    debug!("Model answered with text at iteration {}", iterations);
                    return LoopOutcome {
                        answer,
                        termination: Termination::TextDone,
                        iterations,
                        tool_results,
                    };
                }
                LoopState::NoProgress => {
                    debug!("Model made no progress at iteration {}", iterations);
                    return LoopOutcome {
                        answer: fallback(latest_text, tool_results),
                        termination: Termination::NoProgress,
                        iterations,
                        tool_results,
                    };
                }
            };
        }
    }

    /// Run one requested call; `None` when it failed or produced nothing
    async fn dispatch(&self, call: &FunctionCall, caller: Option<&Caller>) -> Option<Turn> {
        let Some(caller) = caller else {
            warn!("Skipping tool call {} without a caller identity", call.name);
            return None;
        };

        match self.tools.dispatch(&call.name, &call.args, caller).await {
            Ok(serde_json::Value::Null) => {
                debug!("Tool {} returned no result", call.name);
                None
            }
            Ok(value) => Some(Turn::function_result(call.name.clone(), value)),
            Err(e) => {
                warn!("Skipping tool call: {}", e);
                None
            }
        }
    }
}

/// Function calls in order, and all text parts concatenated
fn split_parts(parts: &[Part]) -> (Vec<&FunctionCall>, String) {
    let mut calls = Vec::new();
    let mut text = String::new();
    for part in parts {
        match part {
            Part::FunctionCall(call) => calls.push(call),
            Part::Text(t) => text.push_str(t),
            Part::FunctionResponse(_) => {}
        }
    }
    (calls, text)
}

fn fallback(latest_text: Option<String>, tool_results: usize) -> String {
    if let Some(text) = latest_text {
        return text;
    }

    warn!(
        "No text from the model, answering with a fallback ({} tool results)",
        tool_results
    );
    if tool_results > 0 {
        COMPLETED_FALLBACK.to_string()
    } else {
        NOT_FOUND_FALLBACK.to_string()
    }
}
