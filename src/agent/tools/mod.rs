//! Tool registry
//!
//! Tools are a closed set of kinds. Handlers are registered per kind and the
//! registry is checked when it is built, so a declared tool can never be
//! missing its handler at call time.

#[cfg(test)]
mod tests;

pub mod catalog;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::agent::errors::AgentError;
use crate::agent::llm::ToolDeclaration;

/// Identity of the user a request runs for, passed to every tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub tenant_id: String,
}

impl Caller {
    #[inline]
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
        }
    }
}

macro_rules! tool_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every tool the model can be offered
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ToolKind {
            $($variant),+
        }

        impl ToolKind {
            pub const ALL: &[ToolKind] = &[$(ToolKind::$variant),+];

            /// Name the model uses to call this tool
            #[inline]
            pub const fn name(self) -> &'static str {
                match self {
                    $(ToolKind::$variant => $name),+
                }
            }
        }

        impl FromStr for ToolKind {
            type Err = AgentError;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(ToolKind::$variant),)+
                    other => Err(AgentError::UnknownTool {
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

tool_kinds! {
    SendEmail => "send_email",
    ListCourses => "list_courses",
    ListCourseStudents => "list_course_students",
    GetStudent => "get_student",
    ListStudentSubmissions => "list_student_submissions",
    GetCoursework => "get_coursework",
    GetCourseworkMaterials => "get_coursework_materials",
    ListCourseworks => "list_courseworks",
    DownloadFileFromDriveAndUploadToGemini => "download_file_from_drive_and_upload_to_gemini",
    SummarizeFileFromGemini => "summarize_file_from_gemini",
    CreateQuiz => "create_quiz",
    CreateAnnouncement => "create_announcement",
    ListForms => "list_forms",
    GetForm => "get_form",
    ListFormResponses => "list_form_responses",
    GetFormResponse => "get_form_response",
    QuestionBankGenerator => "question_bank_generator",
    AnswerKeyGenerator => "answer_key_generator",
    CreateCoursework => "create_coursework",
}

impl fmt::Display for ToolKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Executes one kind of tool on behalf of a caller
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Returns a JSON result; `Value::Null` means the tool produced nothing
    async fn call(&self, caller: &Caller, args: &Value) -> Result<Value>;
}

/// Validated mapping from tool kind to handler
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<ToolKind, Arc<dyn ToolHandler>>,
}

impl fmt::Debug for ToolRegistry {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    required: Vec<ToolKind>,
    registrations: Vec<(ToolKind, Arc<dyn ToolHandler>)>,
}

impl ToolRegistryBuilder {
    /// Kinds that must end up with a handler
    #[inline]
    pub fn require(mut self, kinds: impl IntoIterator<Item = ToolKind>) -> Self {
        self.required.extend(kinds);
        self
    }

    #[inline]
    pub fn register<H>(mut self, kind: ToolKind, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        self.registrations.push((kind, Arc::new(handler)));
        self
    }

    #[inline]
    pub fn register_shared(mut self, kind: ToolKind, handler: Arc<dyn ToolHandler>) -> Self {
        self.registrations.push((kind, handler));
        self
    }

    #[inline]
    pub fn build(self) -> Result<ToolRegistry, AgentError> {
        let mut handlers = BTreeMap::new();
        for (kind, handler) in self.registrations {
            if handlers.insert(kind, handler).is_some() {
                return Err(AgentError::DuplicateHandler { kind });
            }
        }

        if let Some(&kind) = self.required.iter().find(|kind| !handlers.contains_key(*kind)) {
            return Err(AgentError::MissingHandler { kind });
        }

        debug!("Built tool registry with {} tools", handlers.len());
        Ok(ToolRegistry { handlers })
    }
}

impl ToolRegistry {
    #[inline]
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// A registry that offers no tools
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[inline]
    pub fn kinds(&self) -> Vec<ToolKind> {
        self.handlers.keys().copied().collect()
    }

    /// Declarations of exactly the registered kinds
    #[inline]
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.handlers
            .keys()
            .map(|kind| catalog::declaration(*kind))
            .collect()
    }

    /// Run the tool the model named
    #[inline]
    pub async fn dispatch(
        &self,
        name: &str,
        args: &Value,
        caller: &Caller,
    ) -> Result<Value, AgentError> {
        let kind: ToolKind = name.parse()?;
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| AgentError::UnknownTool {
                name: name.to_string(),
            })?;

        debug!("Dispatching {} for {}", kind, caller.tenant_id);
        handler
            .call(caller, args)
            .await
            .map_err(|e| AgentError::ToolFailed {
                tool: name.to_string(),
                message: format!("{e:#}"),
            })
    }
}
