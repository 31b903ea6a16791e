//! Agent error handling
//!
//! Failures the orchestration loop and tool registry need to tell apart.

use thiserror::Error;

use crate::agent::tools::ToolKind;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("No handler registered for tool {kind}")]
    MissingHandler { kind: ToolKind },

    #[error("Tool {kind} has more than one handler")]
    DuplicateHandler { kind: ToolKind },

    #[error("Tool execution failed for {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Model call failed: {message}")]
    ModelFailed { message: String },
}

impl AgentError {
    /// Failures that only cost one tool call; the loop carries on after them
    #[inline]
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, Self::UnknownTool { .. } | Self::ToolFailed { .. })
    }
}
