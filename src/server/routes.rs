//! Request routing for the dashboard API.

use crate::chat::{ChatRequest, ChatService, SAMPLE_QUERIES};
use crate::db::{FloatRepository, MeasurementStore, Row};
use crate::error::ArgoError;
use crate::export::{attachment_filename, ExportFormat};
use crate::server::http::{HttpRequest, HttpResponse};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state handed to every request task.
pub struct AppState {
    pub chat: ChatService,
    pub floats: FloatRepository,
    pub store: Arc<dyn MeasurementStore>,
    pub gemini_configured: bool,
    pub model: String,
}

impl AppState {
    pub fn new(
        chat: ChatService,
        store: Arc<dyn MeasurementStore>,
        gemini_configured: bool,
        model: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            floats: FloatRepository::new(store.clone()),
            store,
            gemini_configured,
            model: model.into(),
        }
    }
}

pub async fn route(state: &AppState, request: HttpRequest) -> HttpResponse {
    if request.method == "OPTIONS" {
        return HttpResponse::no_content();
    }

    let owned_segments = request.segments();
    let segments: Vec<&str> = owned_segments.iter().map(String::as_str).collect();
    match (request.method.as_str(), segments.as_slice()) {
        ("POST", ["api", "chat"]) => chat(state, &request).await,
        ("GET", ["api", "sample-queries"]) => {
            HttpResponse::json(200, &json!({ "sampleQueries": SAMPLE_QUERIES }))
        }
        ("GET", ["api", "schema"]) => schema(state).await,
        ("GET", ["api", "health"]) => health(state).await,
        ("GET", ["api", "floats"]) => {
            rows_or_500(state.floats.list_platforms(), "Failed to fetch floats").await
        }
        ("GET", ["api", "floats", "locations"]) => {
            rows_or_500(state.floats.latest_locations(), "Failed to fetch float locations").await
        }
        ("GET", ["api", "floats", id, "data"]) => {
            rows_or_500(state.floats.measurements(id), "Failed to fetch float data").await
        }
        ("GET", ["api", "floats", id, "latest"]) => latest(state, id).await,
        ("GET", ["api", "floats", id, "monthly-avg"]) => {
            rows_or_500(state.floats.monthly_averages(id), "Failed to fetch monthly averages").await
        }
        ("GET", ["api", "floats", id, "monthly-heatmap"]) => {
            rows_or_500(state.floats.monthly_heatmap(id), "Failed to fetch heatmap data").await
        }
        ("GET", ["api", "export"]) => export(state, &request).await,
        _ => HttpResponse::error(404, "Not found", "not_found"),
    }
}

async fn chat(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let chat_request: ChatRequest = match serde_json::from_slice(&request.body) {
        Ok(parsed) => parsed,
        Err(e) => {
            let err = ArgoError::from(e);
            return HttpResponse::error_with_details(
                err.status(),
                "Invalid JSON body",
                err.code(),
                &err.to_string(),
            );
        }
    };

    match state.chat.handle(chat_request).await {
        Ok(response) => HttpResponse::json(200, &response),
        Err(ArgoError::BadRequest(message)) => HttpResponse::error(400, &message, "bad_request"),
        Err(e) => {
            error!(error = %e, "Chat request failed");
            HttpResponse::error(e.status(), "Failed to process chat message", e.code())
        }
    }
}

async fn schema(state: &AppState) -> HttpResponse {
    match state.floats.table_columns().await {
        Ok(columns) => HttpResponse::json(200, &json!({ "table": "floats", "columns": columns })),
        Err(e) => {
            error!(error = %e, "Error fetching schema");
            HttpResponse::json(500, &json!({ "error": "Failed to fetch schema" }))
        }
    }
}

async fn health(state: &AppState) -> HttpResponse {
    match state.store.ping().await {
        Ok(()) => HttpResponse::json(
            200,
            &json!({
                "status": "healthy",
                "database": "connected",
                "gemini": if state.gemini_configured { "configured" } else { "not configured" },
                "model": state.model,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            HttpResponse::json(500, &json!({ "status": "unhealthy", "error": e.to_string() }))
        }
    }
}

async fn latest(state: &AppState, platform_id: &str) -> HttpResponse {
    match state.floats.latest_location(platform_id).await {
        Ok(Some(row)) => HttpResponse::json(200, &row),
        Ok(None) => HttpResponse::json(404, &json!({ "error": "No data found" })),
        Err(e) => {
            error!(error = %e, platform_id, "Error fetching latest location");
            HttpResponse::json(500, &json!({ "error": "Failed to fetch latest location" }))
        }
    }
}

async fn export(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let format = ExportFormat::parse(request.query_param("format"));

    let rendered = match state.floats.export_rows().await {
        Ok(rows) => format.render(&rows),
        Err(e) => Err(e),
    };

    match rendered {
        Ok(body) => {
            let filename = attachment_filename(format, chrono::Utc::now());
            info!(format = format.extension(), bytes = body.len(), "Export generated");
            HttpResponse::raw(200, format.content_type(), body).with_header(
                "Content-Disposition",
                &format!("attachment; filename=\"{}\"", filename),
            )
        }
        Err(e) => {
            error!(error = %e, "Error exporting data");
            HttpResponse::json(500, &json!({ "error": "Failed to export data" }))
        }
    }
}

async fn rows_or_500<F>(rows: F, message: &str) -> HttpResponse
where
    F: Future<Output = crate::error::Result<Vec<Row>>>,
{
    match rows.await {
        Ok(rows) => HttpResponse::json(200, &rows),
        Err(e) => {
            error!(error = %e, "{}", message);
            HttpResponse::json(500, &json!({ "error": message }))
        }
    }
}
