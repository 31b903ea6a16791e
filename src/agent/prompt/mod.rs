
use crate::agent::llm::{ToolDeclaration, Turn};
use crate::agent::tools::Caller;
use crate::chat::{Message, Role as MessageRole};

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an expert educational assistant. Give comprehensive, accurate and well structured answers \
grounded in the context information below, with specific details such as numbers, dates and names \
wherever the context provides them. Use markdown headings and lists for readability, and LaTeX for \
mathematical content ($inline$ or $$ block $$, never inside code blocks). If the context contains \
markdown formatting, preserve it in your answer.

When tools are available, call them yourself to gather what you need instead of asking the user for \
identifiers, and make dependent calls in sequence (for example list courses, then list the students of \
each course). Complete every step of the request before answering, then summarize concretely what was \
found or created.";

pub const CONTINUE_NUDGE: &str = "Continue working on the user's request. If you need to call more \
functions to complete the task, do so now. Only provide a final response when you have fully \
completed all required steps.";

/// Pieces of the user turn the loop starts from
#[derive(Debug, Clone, Copy)]
pub struct PromptParts<'a> {
    pub system_prompt: &'a str,
    pub query: &'a str,
    pub context: &'a [String],
    pub caller: Option<&'a Caller>,
    pub tools: &'a [ToolDeclaration],
}

/// Build the composed user turn text
#[inline]
pub fn compose(parts: &PromptParts<'_>) -> String {
    let mut prompt = String::with_capacity(parts.system_prompt.len() + parts.query.len() + 256);
    prompt.push_str(parts.system_prompt.trim_end());
    prompt.push_str("\n\nCONTEXT INFORMATION:\n");
    prompt.push_str(&format_context(parts.context));

    if let Some(caller) = parts.caller {
        if !parts.tools.is_empty() {
            prompt.push_str("\n\nAVAILABLE FUNCTIONS:\n");
            prompt.push_str(&function_listing(parts.tools));
        }
        prompt.push_str("\n\nUSER ID: ");
        prompt.push_str(&caller.tenant_id);
    }

    prompt.push_str("\n\nUSER QUESTION: ");
    prompt.push_str(parts.query);
    prompt
}

/// `Context {i}: {text}` blocks, 1-based, separated by a blank line
#[inline]
pub fn format_context(context: &[String]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Context {}: {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One `name(params) - description` line per tool; required params come first
#[inline]
pub fn function_listing(tools: &[ToolDeclaration]) -> String {
    tools
        .iter()
        .map(|tool| format!("{}({}) - {}", tool.name, parameter_names(tool).join(", "), tool.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parameter_names(tool: &ToolDeclaration) -> Vec<&str> {
    let mut names: Vec<&str> = tool.parameters["required"]
        .as_array()
        .map(|required| required.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    if let Some(properties) = tool.parameters["properties"].as_object() {
        for name in properties.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
    }
    names
}

/// Replay stored chat messages as model turns
#[inline]
pub fn history_turns(messages: &[Message]) -> Vec<Turn> {
    messages
        .iter()
        .map(|message| match message.role {
            MessageRole::User => Turn::user(message.content.clone()),
            MessageRole::Assistant => Turn::model(message.content.clone()),
        })
        .collect()
}
