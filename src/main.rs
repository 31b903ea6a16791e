use clap::{Parser, Subcommand};
use docent::commands::{
    AskOptions, add_folder_file, ask, create_folder, delete_chat, delete_folder, ingest_document,
    list_chats, list_folders, reset_global, search, show_chat,
};
use docent::config::{Config, run_interactive_config, show_config};
use docent::{DocentError, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "A retrieval-augmented assistant over your documents and folders")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and generation models
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Add a document to the global collection
    Ingest {
        /// PDF, Word or text file to ingest
        file: PathBuf,
    },
    /// Empty the global collection
    Reset,
    /// Search the global collection
    Search {
        query: String,
        /// Number of passages to return
        #[arg(long)]
        k: Option<usize>,
    },
    /// Manage tenant folders
    #[command(subcommand)]
    Folder(FolderCommands),
    /// Ask a question and get one answer
    Ask {
        query: String,
        /// Tenant the question is asked for
        #[arg(long)]
        tenant: Option<String>,
        /// Folder to search; may be repeated
        #[arg(long = "folder")]
        folders: Vec<String>,
        /// Continue an existing chat
        #[arg(long)]
        chat: Option<String>,
        /// Number of context passages to retrieve
        #[arg(long)]
        k: Option<usize>,
    },
    /// Inspect stored chats
    #[command(subcommand)]
    Chat(ChatCommands),
}

#[derive(Subcommand)]
enum FolderCommands {
    /// Create a folder
    Create { tenant: String, name: String },
    /// List a tenant's folders, newest first
    List { tenant: String },
    /// Delete a folder and its collection
    Delete { tenant: String, folder_id: String },
    /// Add a PDF, Word or text file to a folder
    AddFile {
        tenant: String,
        folder_id: String,
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ChatCommands {
    /// List chats, most recently updated first
    List,
    /// Print every message of a chat
    Show { chat_id: String },
    /// Delete a chat
    Delete { chat_id: String },
}

fn load_config() -> Result<Config> {
    Config::load_default().map_err(|e| DocentError::Config(format!("{e:#}")))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { file } => {
            ingest_document(load_config()?, &file).await?;
        }
        Commands::Reset => {
            reset_global(load_config()?).await?;
        }
        Commands::Search { query, k } => {
            search(load_config()?, &query, k).await?;
        }
        Commands::Folder(command) => match command {
            FolderCommands::Create { tenant, name } => {
                create_folder(load_config()?, &tenant, &name).await?;
            }
            FolderCommands::List { tenant } => {
                list_folders(load_config()?, &tenant).await?;
            }
            FolderCommands::Delete { tenant, folder_id } => {
                delete_folder(load_config()?, &tenant, &folder_id).await?;
            }
            FolderCommands::AddFile {
                tenant,
                folder_id,
                file,
            } => {
                add_folder_file(load_config()?, &tenant, &folder_id, &file).await?;
            }
        },
        Commands::Ask {
            query,
            tenant,
            folders,
            chat,
            k,
        } => {
            let options = AskOptions {
                tenant_id: tenant,
                folder_ids: folders,
                chat_id: chat,
                k,
            };
            ask(load_config()?, &query, options).await?;
        }
        Commands::Chat(command) => {
            let config = load_config()?;
            match command {
                ChatCommands::List => list_chats(&config)?,
                ChatCommands::Show { chat_id } => show_chat(&config, &chat_id)?,
                ChatCommands::Delete { chat_id } => delete_chat(&config, &chat_id)?,
            }
        }
    }

    Ok(())
}
