use anyhow::{Context, Result};
use argo_insight::chat::{ChatRequest, ChatService, SAMPLE_QUERIES};
use argo_insight::config::{AppConfig, ChatMode};
use argo_insight::db::{init_pool, MeasurementStore, PgMeasurementStore};
use argo_insight::llm::{GeminiClient, TextGenerator};
use argo_insight::observability::init_tracing;
use argo_insight::security::QueryGuard;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "argo-insight")]
#[command(about = "Ask questions about ARGO float measurements")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one chat turn against the configured database
    Ask {
        question: String,

        /// Use keyword rules and templates instead of the model
        #[arg(long)]
        keyword: bool,
    },
    /// Check a statement against the read-only query guard
    CheckSql { sql: String },
    /// Print the sample questions
    Samples,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Ask { question, keyword } => ask(question, keyword).await?,
        Command::CheckSql { sql } => match QueryGuard::default().check(&sql) {
            Ok(()) => println!("accepted"),
            Err(e) => {
                println!("rejected: {}", e);
                std::process::exit(1);
            }
        },
        Command::Samples => {
            for (i, sample) in SAMPLE_QUERIES.iter().enumerate() {
                println!("{:>2}. {}", i + 1, sample);
            }
        }
    }

    Ok(())
}

async fn ask(question: String, keyword: bool) -> Result<()> {
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if keyword {
        config.chat.mode = ChatMode::Keyword;
    }
    info!(mode = ?config.chat.mode, "Answering question");

    let pool = init_pool(&config.database).await?;
    let store: Arc<dyn MeasurementStore> =
        Arc::new(PgMeasurementStore::new(pool, config.database.query_timeout));

    let generator: Option<Arc<dyn TextGenerator>> = if config.gemini.is_configured() {
        Some(Arc::new(GeminiClient::new(&config.gemini)?))
    } else {
        None
    };

    let service = ChatService::from_config(&config.chat, store, generator)?;
    let response = service.handle(ChatRequest::new(question)).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
