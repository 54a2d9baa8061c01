//! SQL synthesis: natural-language question to candidate SQL.

use crate::chat::intent::QuestionIntent;
use crate::chat::prompts;
use crate::chat::types::ConversationTurn;
use crate::db::QueryParam;
use crate::error::{ArgoError, Result};
use crate::llm::{GenerationOptions, TextGenerator};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

lazy_static! {
    static ref SQL_FENCE: Regex = Regex::new(r"(?is)```sql\s*(.*?)```").unwrap();
    static ref ANY_FENCE: Regex = Regex::new(r"(?s)```\s*(.*?)```").unwrap();
    static ref SQL_LABEL: Regex = Regex::new(r"(?i)^sql\s*:").unwrap();
}

/// SQL proposed for a question, not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

#[async_trait]
pub trait SqlSynthesizer: Send + Sync {
    async fn synthesize(&self, question: &str, history: &[ConversationTurn]) -> Result<CandidateQuery>;
}

/// Asks the hosted model for a query.
pub struct ModelSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl ModelSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl SqlSynthesizer for ModelSynthesizer {
    async fn synthesize(&self, question: &str, history: &[ConversationTurn]) -> Result<CandidateQuery> {
        let prompt = prompts::sql_prompt(question, history);
        let completion = self
            .generator
            .complete(&prompt, GenerationOptions::SQL)
            .await
            .map_err(|e| {
                warn!(error = %e, "Error generating SQL");
                ArgoError::Synthesis(e.to_string())
            })?;

        let sql = clean_sql_output(&completion);
        if sql.is_empty() {
            return Err(ArgoError::Synthesis("Model returned no SQL".to_string()));
        }

        info!(sql = %sql, "Generated SQL");
        Ok(CandidateQuery { sql, params: Vec::new() })
    }
}

/// Matches the question against fixed rules; never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSynthesizer;

#[async_trait]
impl SqlSynthesizer for KeywordSynthesizer {
    async fn synthesize(&self, question: &str, _history: &[ConversationTurn]) -> Result<CandidateQuery> {
        let intent = QuestionIntent::classify(question);
        let (sql, params) = intent.query();
        info!(?intent, sql = %sql, "Matched keyword query");
        Ok(CandidateQuery { sql: sql.to_string(), params })
    }
}

/// Strip Markdown code fences and a leading `SQL:` label from model output.
pub fn clean_sql_output(raw: &str) -> String {
    let body = SQL_FENCE
        .captures(raw)
        .or_else(|| ANY_FENCE.captures(raw))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
        .trim();

    SQL_LABEL.replace(body, "").trim().to_string()
}
