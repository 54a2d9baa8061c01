use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArgoError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("SQL synthesis failed: {0}")]
    Synthesis(String),

    #[error("Query rejected: {0}")]
    Policy(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Response composition failed: {0}")]
    Composition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ArgoError {
    /// Stable machine-readable category, included in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ArgoError::BadRequest(_) => "bad_request",
            ArgoError::Llm(_) => "llm_error",
            ArgoError::Synthesis(_) => "synthesis_failure",
            ArgoError::Policy(_) => "policy_violation",
            ArgoError::Execution(_) => "execution_failure",
            ArgoError::Composition(_) => "composition_failure",
            ArgoError::Config(_) => "config_error",
            ArgoError::Database(_) => "database_error",
            ArgoError::Io(_) => "io_error",
            ArgoError::Json(_) => "json_error",
            ArgoError::Csv(_) => "csv_error",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ArgoError::BadRequest(_) | ArgoError::Json(_) => 400,
            _ => 500,
        }
    }

    /// Failures the chat endpoint absorbs into its fallback answer.
    pub fn is_recoverable_in_chat(&self) -> bool {
        matches!(
            self,
            ArgoError::Synthesis(_)
                | ArgoError::Policy(_)
                | ArgoError::Execution(_)
                | ArgoError::Composition(_)
                | ArgoError::Llm(_)
                | ArgoError::Database(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArgoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ArgoError::BadRequest("x".into()).code(), "bad_request");
        assert_eq!(ArgoError::Policy("x".into()).code(), "policy_violation");
        assert_eq!(ArgoError::Execution("x".into()).code(), "execution_failure");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ArgoError::BadRequest("missing".into()).status(), 400);
        assert_eq!(ArgoError::Config("bad".into()).status(), 500);
        assert_eq!(ArgoError::Synthesis("timeout".into()).status(), 500);
    }

    #[test]
    fn test_bad_request_is_not_absorbed() {
        assert!(!ArgoError::BadRequest("missing".into()).is_recoverable_in_chat());
        assert!(!ArgoError::Config("no key".into()).is_recoverable_in_chat());
        assert!(ArgoError::Policy("drop".into()).is_recoverable_in_chat());
    }
}
