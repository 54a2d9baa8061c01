//! Natural-language chat over the float measurements
//!
//! A question is turned into SQL (model or keyword rules), checked and run
//! by the `QueryExecutor`, and explained (model or templates). History is
//! owned by the client and only passed through.

pub mod composer;
pub mod intent;
pub mod prompts;
pub mod service;
pub mod synthesizer;
pub mod types;

pub use composer::{no_data_message, ModelComposer, ResponseComposer, TemplateComposer};
pub use intent::QuestionIntent;
pub use prompts::SAMPLE_QUERIES;
pub use service::ChatService;
pub use synthesizer::{CandidateQuery, KeywordSynthesizer, ModelSynthesizer, SqlSynthesizer};
pub use types::{ChatRequest, ChatResponse, ConversationTurn, Role};
