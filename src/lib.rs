pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod llm;
pub mod observability;
pub mod query_executor;
pub mod security;
pub mod server;

pub use chat::{ChatRequest, ChatResponse, ChatService, ConversationTurn};
pub use config::{AppConfig, ChatMode};
pub use error::{ArgoError, Result};
pub use query_executor::QueryExecutor;
pub use security::QueryGuard;
