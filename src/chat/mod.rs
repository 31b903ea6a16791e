// Conversation store
// One JSON document per chat under chat_histories/


use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::collection::validate_identifier;
use crate::database::write_atomically;

pub const DEFAULT_TITLE: &str = "New Chat";
const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Invalid chat id: {0:?}")]
    InvalidChatId(String),
    #[error("Message content is empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    fn new(chat_id: String) -> Self {
        let now = Utc::now();
        Self {
            chat_id,
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<&Chat> for ChatSummary {
    #[inline]
    fn from(chat: &Chat) -> Self {
        Self {
            chat_id: chat.chat_id.clone(),
            title: chat.title.clone(),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            message_count: chat.messages.len(),
        }
    }
}

/// Chat histories on disk.
///
/// Each append is a read-modify-write of the whole chat file. Two processes
/// appending to the same chat at once can lose one of the messages.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    #[inline]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.chat_history_path())
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create and persist an empty chat
    #[inline]
    pub fn create(&self) -> Result<Chat> {
        let chat = Chat::new(Uuid::new_v4().to_string());
        self.save(&chat)?;
        debug!("Created chat {}", chat.chat_id);
        Ok(chat)
    }

    /// Append a message, creating the chat if needed; returns the chat id
    #[inline]
    pub fn append(&self, chat_id: Option<&str>, role: Role, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(ConversationError::EmptyMessage.into());
        }

        let mut chat = match chat_id {
            Some(id) => self
                .get_chat(id)?
                .unwrap_or_else(|| Chat::new(id.to_string())),
            None => Chat::new(Uuid::new_v4().to_string()),
        };

        if role == Role::User && !chat.has_user_message() {
            chat.title = title_from(content);
        }

        let now = Utc::now();
        chat.messages.push(Message {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        chat.updated_at = now;

        self.save(&chat)?;
        debug!(
            "Appended {:?} message to chat {} ({} messages)",
            role,
            chat.chat_id,
            chat.messages.len()
        );
        Ok(chat.chat_id)
    }

    /// Messages in conversation order; an unknown chat has none
    #[inline]
    pub fn get(&self, chat_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .get_chat(chat_id)?
            .map(|chat| chat.messages)
            .unwrap_or_default())
    }

    #[inline]
    pub fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        let path = self.path_for(chat_id)?;
        match fs::read_to_string(&path) {
            Ok(content) => {
                let chat = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse chat file {}", path.display()))?;
                Ok(Some(chat))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Every chat, most recently updated first. Unreadable files are skipped.
    #[inline]
    pub fn list_summaries(&self) -> Result<Vec<ChatSummary>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.dir.display()));
            }
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read {}", self.dir.display()))?
                .path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(serde_json::from_str::<Chat>(&content)?));
            match parsed {
                Ok(chat) => summaries.push(ChatSummary::from(&chat)),
                Err(e) => warn!("Skipping unreadable chat file {}: {}", path.display(), e),
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Returns whether the chat existed
    #[inline]
    pub fn delete(&self, chat_id: &str) -> Result<bool> {
        let path = self.path_for(chat_id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted chat {}", chat_id);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn save(&self, chat: &Chat) -> Result<()> {
        let path = self.path_for(&chat.chat_id)?;
        let json = serde_json::to_vec_pretty(chat).context("Failed to serialize chat")?;
        write_atomically(&path, &json)
    }

    fn path_for(&self, chat_id: &str) -> Result<PathBuf> {
        validate_identifier(chat_id)
            .map_err(|_| ConversationError::InvalidChatId(chat_id.to_string()))?;
        Ok(self.dir.join(format!("{chat_id}.json")))
    }
}

/// First 50 characters, with `...` when the message is longer
#[inline]
pub fn title_from(content: &str) -> String {
    let content = content.trim();
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}
