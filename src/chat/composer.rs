//! Response composition: question, SQL and rows to a readable answer.

use crate::chat::intent::QuestionIntent;
use crate::chat::prompts;
use crate::db::Row;
use crate::error::{ArgoError, Result};
use crate::llm::{GenerationOptions, TextGenerator};
use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait ResponseComposer: Send + Sync {
    async fn compose(&self, question: &str, sql: &str, rows: &[Row]) -> Result<String>;
}

pub fn no_data_message(question: &str, sql: &str) -> String {
    format!(
        "I couldn't find any data matching your query \"{}\". The SQL query executed was: {}",
        question, sql
    )
}

/// Has the hosted model explain the result set.
pub struct ModelComposer {
    generator: Arc<dyn TextGenerator>,
    sample_rows: usize,
}

impl ModelComposer {
    pub fn new(generator: Arc<dyn TextGenerator>, sample_rows: usize) -> Self {
        Self { generator, sample_rows }
    }
}

#[async_trait]
impl ResponseComposer for ModelComposer {
    async fn compose(&self, question: &str, sql: &str, rows: &[Row]) -> Result<String> {
        if rows.is_empty() {
            return Ok(no_data_message(question, sql));
        }

        let prompt = prompts::explanation_prompt(question, sql, rows, self.sample_rows);
        let text = self
            .generator
            .complete(&prompt, GenerationOptions::EXPLANATION)
            .await
            .map_err(|e| {
                warn!(error = %e, "Error generating response");
                ArgoError::Composition(e.to_string())
            })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ArgoError::Composition("Model returned an empty explanation".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Canned sentences keyed on the same rules as the keyword synthesizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateComposer;

#[async_trait]
impl ResponseComposer for TemplateComposer {
    async fn compose(&self, question: &str, sql: &str, rows: &[Row]) -> Result<String> {
        Ok(render_template(question, sql, rows))
    }
}

pub fn render_template(question: &str, sql: &str, rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return no_data_message(question, sql);
    };
    let count = rows.len();

    match QuestionIntent::classify(question) {
        QuestionIntent::AllFloats => format!(
            "I found {} unique floats in the database. Here are the platform IDs: {}",
            count,
            column_list(rows, "platform_id")
        ),
        QuestionIntent::LatestLocation { platform_id } => format!(
            "The latest location for float {} is at coordinates {}°N, {}°E.",
            text_or(first, "platform_id", &platform_id),
            number(first, "latitude", 4),
            number(first, "longitude", 4)
        ),
        QuestionIntent::AverageTemperature { platform_id } => format!(
            "The average temperature for float {} is {}°C.",
            platform_id,
            number(first, "avg_temp", 2)
        ),
        QuestionIntent::TemperatureRange => format!(
            "Temperature statistics across all floats: Minimum: {}°C, Maximum: {}°C, Average: {}°C.",
            number(first, "min_temp", 2),
            number(first, "max_temp", 2),
            number(first, "avg_temp", 2)
        ),
        QuestionIntent::HighestSalinity => format!(
            "Here are the floats with the highest salinity measurements: {}",
            rows.iter()
                .map(|r| format!("Float {}: {} PSU", text(r, "platform_id"), number(r, "max_salinity", 2)))
                .join(", ")
        ),
        QuestionIntent::DeepestPressure => format!(
            "Here are the floats with the deepest pressure measurements: {}",
            rows.iter()
                .map(|r| format!("Float {}: {} dbar", text(r, "platform_id"), number(r, "max_pressure", 2)))
                .join(", ")
        ),
        QuestionIntent::AtlanticFloats => format!(
            "I found {} floats in the Atlantic Ocean: {}",
            count,
            column_list(rows, "platform_id")
        ),
        QuestionIntent::PacificFloats => format!(
            "I found {} floats in the Pacific Ocean: {}",
            count,
            column_list(rows, "platform_id")
        ),
        QuestionIntent::MonthlyAverages { platform_id } => format!(
            "Monthly averages for float {} cover {} months. Most recent month: average temperature {}°C, average salinity {} PSU.",
            platform_id,
            count,
            number(&rows[count - 1], "avg_temp", 2),
            number(&rows[count - 1], "avg_salinity", 2)
        ),
        QuestionIntent::MeasurementsInYear { year } => format!(
            "I found {} measurements from {}. Here's a sample of the data:",
            count, year
        ),
        QuestionIntent::Unmatched => format!(
            "I found {} results for your query \"{}\". Here's a sample of the data:",
            count, question
        ),
    }
}

fn column_list(rows: &[Row], column: &str) -> String {
    rows.iter().map(|r| text(r, column)).join(", ")
}

fn text(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "n/a".to_string(),
        Some(other) => other.to_string(),
    }
}

fn text_or(row: &Row, column: &str, default: &str) -> String {
    match row.get(column) {
        Some(Value::Null) | None => default.to_string(),
        _ => text(row, column),
    }
}

fn number(row: &Row, column: &str, decimals: usize) -> String {
    let value = match row.get(column) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        _ => None,
    };
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "n/a".to_string())
}
