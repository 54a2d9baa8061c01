//! In-memory stand-ins for the database and the hosted model.
#![allow(dead_code)]

use argo_insight::db::{MeasurementStore, QueryParam, Row};
use argo_insight::llm::{GenerationOptions, TextGenerator};
use argo_insight::{ArgoError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

pub fn rows(value: Value) -> Vec<Row> {
    value
        .as_array()
        .expect("array of rows")
        .iter()
        .map(|v| v.as_object().expect("row object").clone())
        .collect()
}

/// Returns canned rows (or an error) and records every statement it receives.
#[derive(Default)]
pub struct StubStore {
    pub rows: Vec<Row>,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, Vec<QueryParam>)>>,
}

impl StubStore {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self { rows, ..Default::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn calls(&self) -> Vec<(String, Vec<QueryParam>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeasurementStore for StubStore {
    async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>> {
        self.calls.lock().unwrap().push((sql.to_string(), params.to_vec()));
        if self.fail {
            return Err(ArgoError::Execution("connection refused".to_string()));
        }
        Ok(self.rows.clone())
    }

    async fn ping(&self) -> Result<()> {
        if self.fail {
            return Err(ArgoError::Execution("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Answers by request kind: SQL, explanation or fallback.
pub struct StubGenerator {
    pub sql: Result<String>,
    pub explanation: Result<String>,
    pub fallback: String,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(sql: &str, explanation: &str, fallback: &str) -> Self {
        Self {
            sql: Ok(sql.to_string()),
            explanation: Ok(explanation.to_string()),
            fallback: fallback.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// The SQL request fails, as on an API error or timeout.
    pub fn failing_sql(fallback: &str) -> Self {
        Self {
            sql: Err(ArgoError::Llm("Gemini API call timed out".to_string())),
            ..Self::new("", "", fallback)
        }
    }

    /// SQL succeeds but the explanation request fails.
    pub fn failing_explanation(sql: &str, fallback: &str) -> Self {
        Self {
            explanation: Err(ArgoError::Llm("Gemini API error: 503".to_string())),
            ..Self::new(sql, "", fallback)
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn replay(result: &Result<String>) -> Result<String> {
    match result {
        Ok(text) => Ok(text.clone()),
        Err(e) => Err(ArgoError::Llm(e.to_string())),
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn complete(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if options == GenerationOptions::SQL {
            replay(&self.sql)
        } else if options == GenerationOptions::EXPLANATION {
            replay(&self.explanation)
        } else {
            Ok(self.fallback.clone())
        }
    }

    fn model_id(&self) -> &str {
        "stub-model"
    }
}
