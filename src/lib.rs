use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocentError>;

#[derive(Error, Debug)]
pub enum DocentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for DocentError {
    /// Classify by the first typed error found in the chain
    #[inline]
    fn from(error: anyhow::Error) -> Self {
        let message = format!("{error:#}");
        for cause in error.chain() {
            if cause.is::<config::ConfigError>() {
                return Self::Config(message);
            }
            if cause.is::<sqlx::Error>() || cause.is::<folders::FolderError>() {
                return Self::Database(message);
            }
            if cause.is::<database::CollectionError>() {
                return Self::Storage(message);
            }
            if cause.is::<embeddings::EmbeddingError>() {
                return Self::Embedding(message);
            }
            if cause.is::<agent::AgentError>() {
                return Self::Tool(message);
            }
            if cause.is::<chat::ConversationError>() {
                return Self::Conversation(message);
            }
        }
        Self::Other(error)
    }
}

pub mod agent;
pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod extraction;
pub mod folders;
pub mod indexer;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;
