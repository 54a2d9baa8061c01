//! Prompt templates for the hosted model and the canned fallback text.

use crate::chat::types::{ConversationTurn, Role};
use crate::db::Row;

/// Schema description embedded in every model prompt.
pub const DB_SCHEMA: &str = r#"Database Schema for Argo Float Data:

Table: floats
Columns:
- platform_id (text): Unique identifier for each float/platform
- measurement_date (timestamp): When the measurement was taken
- latitude (float): Geographic latitude coordinate
- longitude (float): Geographic longitude coordinate
- pressure_dbar (float): Pressure measurement in decibars
- temperature_celsius (float): Temperature measurement in Celsius
- salinity_psu (float): Salinity measurement in practical salinity units

Sample queries:
- Get all unique platform IDs: SELECT DISTINCT platform_id FROM floats
- Get latest location for a platform: SELECT platform_id, latitude, longitude FROM floats WHERE platform_id = 'X' ORDER BY measurement_date DESC LIMIT 1
- Get temperature range for a platform: SELECT MIN(temperature_celsius), MAX(temperature_celsius), AVG(temperature_celsius) FROM floats WHERE platform_id = 'X'
- Get data within date range: SELECT * FROM floats WHERE measurement_date BETWEEN '2023-01-01' AND '2023-12-31'
- Get data within geographic bounds: SELECT * FROM floats WHERE latitude BETWEEN 30 AND 40 AND longitude BETWEEN -80 AND -70
"#;

pub const SAMPLE_QUERIES: [&str; 10] = [
    "Show me all available floats",
    "What's the latest location of float 1900816?",
    "What's the average temperature for float 1900816?",
    "Show me all measurements from 2023",
    "What floats are in the Atlantic Ocean?",
    "Show me the temperature range for all floats",
    "Which float has the highest salinity measurements?",
    "Show me data from floats in the Pacific Ocean",
    "What's the deepest pressure measurement recorded?",
    "Show me monthly averages for float 1900816",
];

/// Turns of prior conversation included in the SQL prompt.
const HISTORY_WINDOW: usize = 6;

pub fn sql_prompt(question: &str, history: &[ConversationTurn]) -> String {
    let mut prompt = format!(
        "You are a SQL expert for an Argo float oceanographic database.\n\n\
         Database Schema:\n{}\n\
         Write a single PostgreSQL SELECT query that answers the user's question.\n\
         Rules:\n\
         - Return ONLY the SQL, no explanations.\n\
         - If the question includes a concrete platform id, use it directly.\n\
         - Use measurement_date for time filters.\n\
         - Include ORDER BY when returning multiple rows.\n\
         - Add LIMIT 100 when result set may be large.\n",
        DB_SCHEMA
    );

    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    if !recent.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for turn in recent {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{}: {}\n", speaker, turn.content));
        }
    }

    prompt.push_str(&format!("\nUser question: {}", question));
    prompt
}

pub fn explanation_prompt(question: &str, sql: &str, rows: &[Row], sample_rows: usize) -> String {
    let results_context = if rows.is_empty() {
        "Query returned no results".to_string()
    } else {
        let sample = &rows[..rows.len().min(sample_rows)];
        let rendered = serde_json::to_string_pretty(sample).unwrap_or_else(|_| "[]".to_string());
        format!("Query Results ({} rows):\n{}", rows.len(), rendered)
    };

    format!(
        "You are a helpful oceanographic data assistant.\n\n\
         Database Context:\n{}\n\
         User asked: \"{}\"\n\
         SQL executed: {}\n\
         {}\n\n\
         Explain the results clearly and concisely, suggest one related follow-up query, \
         and keep the tone professional.",
        DB_SCHEMA, question, sql, results_context
    )
}

pub fn fallback_prompt(question: &str) -> String {
    format!(
        "You are a helpful oceanographic data assistant. The user asked: \"{}\".\n\n\
         Provide a helpful response about Argo float data. If you can't answer their specific \
         question, suggest some sample queries they could try like:\n\
         - \"{}\"\n\
         - \"{}\"\n\
         - \"Show me temperature data for a specific float\"\n\n\
         Keep your response friendly and helpful.",
        question, SAMPLE_QUERIES[0], SAMPLE_QUERIES[1]
    )
}

/// Answer used when no query ran and no model is available to phrase one.
pub fn static_fallback_text() -> String {
    format!(
        "I couldn't answer that from the float database. Try one of these questions:\n- {}\n- {}\n- {}",
        SAMPLE_QUERIES[0], SAMPLE_QUERIES[1], SAMPLE_QUERIES[5]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_prompt_includes_recent_history_only() {
        let history: Vec<ConversationTurn> = (0..8)
            .map(|i| ConversationTurn::user(format!("turn-{}", i)))
            .collect();
        let prompt = sql_prompt("and now?", &history);
        assert!(!prompt.contains("turn-1\n"));
        assert!(prompt.contains("User: turn-2"));
        assert!(prompt.contains("User: turn-7"));
        assert!(prompt.ends_with("User question: and now?"));
    }

    #[test]
    fn test_sql_prompt_without_history() {
        let prompt = sql_prompt("floats?", &[]);
        assert!(!prompt.contains("Conversation so far"));
        assert!(prompt.contains("Table: floats"));
    }

    #[test]
    fn test_explanation_prompt_caps_sample_rows() {
        let rows: Vec<Row> = (0..15)
            .map(|i| json!({ "platform_id": format!("P{:02}", i) }).as_object().unwrap().clone())
            .collect();
        let prompt = explanation_prompt("which floats?", "SELECT 1", &rows, 10);
        assert!(prompt.contains("Query Results (15 rows)"));
        assert!(prompt.contains("P09"));
        assert!(!prompt.contains("P10"));
    }
}
