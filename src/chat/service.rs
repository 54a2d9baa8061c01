//! Chat orchestration: synthesize, execute, compose, or fall back.

use crate::chat::composer::{ModelComposer, ResponseComposer, TemplateComposer};
use crate::chat::prompts;
use crate::chat::synthesizer::{KeywordSynthesizer, ModelSynthesizer, SqlSynthesizer};
use crate::chat::types::{ChatRequest, ChatResponse, ConversationTurn};
use crate::config::{ChatConfig, ChatMode};
use crate::db::{MeasurementStore, Row};
use crate::error::{ArgoError, Result};
use crate::llm::{GenerationOptions, TextGenerator};
use crate::query_executor::QueryExecutor;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct ChatService {
    synthesizer: Box<dyn SqlSynthesizer>,
    executor: QueryExecutor,
    composer: Box<dyn ResponseComposer>,
    /// Phrases the fallback answer; a static text is used without it.
    fallback: Option<Arc<dyn TextGenerator>>,
    max_response_rows: usize,
}

struct Answered {
    text: String,
    sql: String,
    rows: Vec<Row>,
}

impl ChatService {
    pub fn new(
        synthesizer: Box<dyn SqlSynthesizer>,
        executor: QueryExecutor,
        composer: Box<dyn ResponseComposer>,
        fallback: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self {
            synthesizer,
            executor,
            composer,
            fallback,
            max_response_rows: ChatConfig::default().max_response_rows,
        }
    }

    /// Wire the variants selected by `config.mode`. Model mode requires a generator.
    pub fn from_config(
        config: &ChatConfig,
        store: Arc<dyn MeasurementStore>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self> {
        let executor = QueryExecutor::new(store);
        let service = match (config.mode, generator) {
            (ChatMode::Model, Some(generator)) => Self::new(
                Box::new(ModelSynthesizer::new(generator.clone())),
                executor,
                Box::new(ModelComposer::new(generator.clone(), config.prompt_sample_rows)),
                Some(generator),
            ),
            (ChatMode::Model, None) => {
                return Err(ArgoError::Config(
                    "CHAT_MODE=model requires GEMINI_API_KEY".to_string(),
                ))
            }
            (ChatMode::Keyword, generator) => Self::new(
                Box::new(KeywordSynthesizer),
                executor,
                Box::new(TemplateComposer),
                generator,
            ),
        };
        Ok(service.with_max_response_rows(config.max_response_rows))
    }

    pub fn with_max_response_rows(mut self, rows: usize) -> Self {
        self.max_response_rows = rows;
        self
    }

    /// Handle one chat turn. Synthesis, policy, execution and composition
    /// failures are answered with the fallback text; a missing message and
    /// anything unexpected (configuration, I/O) are returned as errors.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse> {
        let message = request
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ArgoError::BadRequest("Message is required".to_string()))?;
        let history = request.conversation_history;

        info!(message = %message, history = history.len(), "User query");

        let (response, sql_query, results_count, data) = match self.answer(&message, &history).await {
            Ok(answered) => {
                let count = answered.rows.len();
                let mut rows = answered.rows;
                rows.truncate(self.max_response_rows);
                (answered.text, Some(answered.sql), count, rows)
            }
            Err(e) if e.is_recoverable_in_chat() => {
                warn!(error = %e, code = e.code(), "SQL path failed, using fallback response");
                (self.fallback_text(&message).await, None, 0, Vec::new())
            }
            Err(e) => {
                error!(error = %e, code = e.code(), "Chat turn failed");
                return Err(e);
            }
        };

        let mut conversation_history = history;
        conversation_history.push(ConversationTurn::user(message));
        conversation_history.push(ConversationTurn::assistant(response.clone()));

        Ok(ChatResponse {
            response,
            sql_query,
            results_count,
            data,
            conversation_history,
        })
    }

    async fn answer(&self, message: &str, history: &[ConversationTurn]) -> Result<Answered> {
        let candidate = self.synthesizer.synthesize(message, history).await?;
        let rows = self.executor.execute(&candidate.sql, &candidate.params).await?;
        let text = self.composer.compose(message, &candidate.sql, &rows).await?;
        Ok(Answered { text, sql: candidate.sql, rows })
    }

    async fn fallback_text(&self, message: &str) -> String {
        let Some(generator) = &self.fallback else {
            return prompts::static_fallback_text();
        };

        match generator
            .complete(&prompts::fallback_prompt(message), GenerationOptions::FALLBACK)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => prompts::static_fallback_text(),
            Err(e) => {
                warn!(error = %e, "Fallback generation failed");
                prompts::static_fallback_text()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::synthesizer::CandidateQuery;
    use crate::db::QueryParam;
    use async_trait::async_trait;

    struct FailingSynthesizer(fn() -> ArgoError);

    #[async_trait]
    impl SqlSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _question: &str, _history: &[ConversationTurn]) -> Result<CandidateQuery> {
            Err((self.0)())
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl MeasurementStore for EmptyStore {
        async fn fetch(&self, _sql: &str, _params: &[QueryParam]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn service(failure: fn() -> ArgoError) -> ChatService {
        ChatService::new(
            Box::new(FailingSynthesizer(failure)),
            QueryExecutor::new(Arc::new(EmptyStore)),
            Box::new(TemplateComposer),
            None,
        )
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_answered_by_fallback() {
        let response = service(|| ArgoError::Synthesis("model timed out".to_string()))
            .handle(ChatRequest::new("Where are the floats?"))
            .await
            .unwrap();
        assert_eq!(response.response, prompts::static_fallback_text());
        assert_eq!(response.sql_query, None);
        assert_eq!(response.conversation_history.len(), 2);
    }

    #[tokio::test]
    async fn test_unexpected_failure_is_returned() {
        let err = service(|| ArgoError::Config("GEMINI_API_KEY is not set".to_string()))
            .handle(ChatRequest::new("Where are the floats?"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "config_error");
        assert_eq!(err.status(), 500);
    }
}
