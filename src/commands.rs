use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::agent::llm::GeminiClient;
use crate::agent::{
    AgentSettings, Caller, ChatRequest, LanguageModel, Orchestrator, ToolRegistry,
};
use crate::chat::ConversationStore;
use crate::config::Config;
use crate::database::{CollectionRegistry, Database, ScopeKey};
use crate::embeddings::{Embedder, OllamaClient};
use crate::extraction::extract_text;
use crate::folders::FolderService;
use crate::indexer::Indexer;
use crate::retrieval::{QueryExpander, Retriever};

/// Long-lived pieces shared by every command: loaded once per process
struct Services {
    config: Config,
    embedder: Arc<dyn Embedder>,
    registry: Arc<CollectionRegistry>,
}

impl Services {
    fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(OllamaClient::new(&config).context("Failed to create embedding client")?);
        let registry = Arc::new(CollectionRegistry::from_config(&config));
        Ok(Self {
            config,
            embedder,
            registry,
        })
    }

    fn indexer(&self) -> Indexer {
        Indexer::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.registry),
            self.config.chunking.clone(),
        )
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(Arc::clone(&self.embedder), Arc::clone(&self.registry))
            .with_expander(QueryExpander::new(self.config.retrieval.query_expansion))
    }

    async fn folders(&self) -> Result<FolderService> {
        let database = Database::new(self.config.database_path())
            .await
            .context("Failed to initialize database")?;
        Ok(FolderService::new(
            database,
            Arc::clone(&self.registry),
            self.indexer(),
        ))
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        let style = ProgressStyle::with_template("{spinner} {elapsed} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        ProgressBar::new_spinner().with_style(style)
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Chunk, embed and store a document in the global collection
#[inline]
pub async fn ingest_document(config: Config, path: &Path) -> Result<()> {
    let services = Services::new(config)?;
    let text = extract_text(path)?;

    let bar = spinner(&format!("Ingesting {}", display_name(path)));
    let report = services.indexer().index_document(&text).await;
    bar.finish_and_clear();
    let report = report?;

    println!(
        "{} Ingested {} as {} ({} chunks)",
        style("✓").green(),
        path.display(),
        report.doc_id,
        report.chunk_count
    );
    Ok(())
}

/// Empty the global collection
#[inline]
pub async fn reset_global(config: Config) -> Result<()> {
    let services = Services::new(config)?;
    services.indexer().reset_global().await?;
    println!("{} Global collection reset", style("✓").green());
    Ok(())
}

/// Print the passages the global collection returns for `query`
#[inline]
pub async fn search(config: Config, query: &str, k: Option<usize>) -> Result<()> {
    let services = Services::new(config)?;
    let k = k.unwrap_or(services.config.retrieval.default_k);
    let chunks = services.retriever().retrieve_chunks(query, k, &[]).await?;

    if chunks.is_empty() {
        println!("No results. Use 'docent ingest <file>' to add documents.");
        return Ok(());
    }

    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "{} {} (distance {:.4})",
            style(format!("[{}]", i + 1)).bold(),
            style(&chunk.chunk_id).cyan(),
            chunk.distance
        );
        println!("{}", chunk.text);
        println!();
    }
    Ok(())
}

#[inline]
pub async fn create_folder(config: Config, tenant_id: &str, name: &str) -> Result<()> {
    let services = Services::new(config)?;
    let folder = services
        .folders()
        .await?
        .create_folder(tenant_id, name)
        .await?;
    println!(
        "Created folder: {} (ID: {})",
        folder.folder_name, folder.folder_id
    );
    Ok(())
}

#[inline]
pub async fn list_folders(config: Config, tenant_id: &str) -> Result<()> {
    let services = Services::new(config)?;
    let folders = services.folders().await?.list_folders(tenant_id).await?;

    if folders.is_empty() {
        println!("No folders for tenant {tenant_id}.");
        println!("Use 'docent folder create {tenant_id} <name>' to add one.");
        return Ok(());
    }

    println!("Folders ({} total):", folders.len());
    println!();
    for folder in &folders {
        println!("📁 {} (ID: {})", folder.folder_name, folder.folder_id);
        println!("   Files: {}", folder.file_count);
        println!(
            "   Created: {}",
            folder.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }
    Ok(())
}

#[inline]
pub async fn delete_folder(config: Config, tenant_id: &str, folder_id: &str) -> Result<()> {
    let services = Services::new(config)?;
    if services
        .folders()
        .await?
        .delete_folder(tenant_id, folder_id)
        .await?
    {
        println!("{} Folder {} deleted", style("✓").green(), folder_id);
    } else {
        println!("Folder not found: {folder_id}");
    }
    Ok(())
}

/// Extract, chunk and store a file in a tenant's folder
#[inline]
pub async fn add_folder_file(
    config: Config,
    tenant_id: &str,
    folder_id: &str,
    path: &Path,
) -> Result<()> {
    let services = Services::new(config)?;
    let folders = services.folders().await?;
    let text = extract_text(path)?;
    let name = display_name(path);

    let bar = spinner(&format!("Ingesting {name}"));
    let ingested = folders.ingest_file(tenant_id, folder_id, &name, &text).await;
    bar.finish_and_clear();
    let ingested = ingested?;

    println!(
        "{} Added {} to folder {} ({} chunks, file ID {})",
        style("✓").green(),
        name,
        folder_id,
        ingested.chunk_count,
        ingested.file.file_id
    );
    Ok(())
}

/// Options of one `ask` invocation
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub tenant_id: Option<String>,
    pub folder_ids: Vec<String>,
    pub chat_id: Option<String>,
    pub k: Option<usize>,
}

/// Build the request an `ask` invocation sends to the orchestrator
#[inline]
pub fn ask_request(query: &str, options: AskOptions) -> Result<ChatRequest> {
    let scopes = match options.tenant_id.as_deref() {
        Some(tenant_id) => options
            .folder_ids
            .iter()
            .map(|folder_id| ScopeKey::folder(tenant_id, folder_id))
            .collect::<Result<Vec<_>, _>>()?,
        None if !options.folder_ids.is_empty() => {
            anyhow::bail!("--folder requires --tenant");
        }
        None => Vec::new(),
    };

    Ok(ChatRequest {
        query: query.to_string(),
        chat_id: options.chat_id,
        caller: options.tenant_id.map(Caller::new),
        scopes,
        k: options.k,
    })
}

/// Answer one question through the agent loop
#[inline]
pub async fn ask(config: Config, query: &str, options: AskOptions) -> Result<()> {
    let request = ask_request(query, options)?;
    let services = Services::new(config)?;
    let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(&services.config)?);
    let orchestrator = Orchestrator::new(
        model,
        ToolRegistry::empty(),
        services.retriever(),
        ConversationStore::from_config(&services.config),
    )
    .with_settings(AgentSettings::from_config(&services.config));

    let bar = spinner("Thinking");
    let reply = orchestrator.respond(request).await;
    bar.finish_and_clear();
    let reply = reply?;

    info!(
        "Chat {} finished after {} iterations ({:?})",
        reply.chat_id, reply.iterations, reply.termination
    );
    println!("{}", reply.answer);
    println!();
    println!(
        "{}",
        style(format!(
            "chat {} · {} context passages",
            reply.chat_id,
            reply.context.len()
        ))
        .dim()
    );
    Ok(())
}

#[inline]
pub fn list_chats(config: &Config) -> Result<()> {
    let summaries = ConversationStore::from_config(config).list_summaries()?;
    if summaries.is_empty() {
        println!("No chats yet.");
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "💬 {} ({} messages, updated {})",
            summary.title,
            summary.message_count,
            summary.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("   ID: {}", summary.chat_id);
    }
    Ok(())
}

#[inline]
pub fn show_chat(config: &Config, chat_id: &str) -> Result<()> {
    let Some(chat) = ConversationStore::from_config(config).get_chat(chat_id)? else {
        println!("Chat not found: {chat_id}");
        return Ok(());
    };

    println!("{}", style(&chat.title).bold().cyan());
    println!();
    for message in &chat.messages {
        println!(
            "{} {}",
            style(format!("{:?}:", message.role)).bold(),
            style(message.timestamp.format("%Y-%m-%d %H:%M:%S")).dim()
        );
        println!("{}", message.content);
        println!();
    }
    Ok(())
}

#[inline]
pub fn delete_chat(config: &Config, chat_id: &str) -> Result<()> {
    if ConversationStore::from_config(config).delete(chat_id)? {
        println!("{} Chat {} deleted", style("✓").green(), chat_id);
    } else {
        println!("Chat not found: {chat_id}");
    }
    Ok(())
}
