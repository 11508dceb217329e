//! JSON handlers for the API server.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::AppState;
use crate::pipeline::{PipelineError, ProcessOptions, ProcessOutcome};

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub force_regenerate: bool,
    #[serde(default)]
    pub skip_acquisition: bool,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub content_id: String,
    pub status: &'static str,
    pub cached: bool,
    pub sections: Vec<String>,
    pub language: String,
    pub paywall_warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl From<ProcessOutcome> for ProcessResponse {
    fn from(outcome: ProcessOutcome) -> Self {
        Self {
            content_id: outcome.content_id,
            status: outcome.status.as_str(),
            cached: outcome.cached,
            sections: outcome.sections,
            language: outcome.language,
            paywall_warning: outcome.paywall_warning,
            failure_message: outcome.failure_message,
        }
    }
}

fn error_response(e: PipelineError) -> Response {
    match e {
        PipelineError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("content {id} not found") })),
        )
            .into_response(),
        PipelineError::QuotaExceeded { message, status, upgrade_required, tier } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::TOO_MANY_REQUESTS),
            Json(serde_json::json!({
                "error": message,
                "upgrade_required": upgrade_required,
                "tier": tier,
            })),
        )
            .into_response(),
        PipelineError::Repository(e) => {
            error!("request failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// Submit a URL for analysis. Runs the pipeline to completion and returns
/// the outcome; acquisition failures come back as 200 with a
/// `failure_message` the client can show.
pub async fn process(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Response {
    let options = ProcessOptions {
        force_regenerate: request.force_regenerate,
        skip_acquisition: request.skip_acquisition,
    };
    match state
        .pipeline
        .process_url(&request.url, request.user_id.as_deref(), &request.language, options)
        .await
    {
        Ok(outcome) => Json(ProcessResponse::from(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default = "default_language")]
    pub language: String,
}

/// Current state of a content item and its analysis.
pub async fn status(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let deps = state.pipeline.deps();
    let item = match deps.content.get(&content_id) {
        Ok(Some(item)) => item,
        Ok(None) => return error_response(PipelineError::NotFound(content_id)),
        Err(e) => return error_response(e.into()),
    };
    let summary = match deps.summaries.get(&content_id, &query.language) {
        Ok(summary) => summary,
        Err(e) => return error_response(e.into()),
    };

    let (status, sections) = summary
        .map(|s| {
            let sections: Vec<String> =
                s.present_sections().iter().map(|n| n.to_string()).collect();
            (s.processing_status.as_str(), sections)
        })
        .unwrap_or(("none", Vec::new()));

    Json(serde_json::json!({
        "content_id": item.id,
        "url": item.url,
        "source_type": item.source_type.as_str(),
        "title": item.title,
        "tags": item.tags,
        "detected_tone": item.detected_tone,
        "status": status,
        "sections": sections,
        "failure_message": item.failure_category().map(|c| c.user_message()),
    }))
    .into_response()
}

/// Domain credibility table, most-analyzed first.
pub async fn list_domains(State(state): State<AppState>) -> Response {
    match state.pipeline.deps().domains.list(100) {
        Ok(stats) => {
            let rows: Vec<_> = stats
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "domain": s.domain,
                        "analyses": s.analysis_count,
                        "average_quality": s.average_quality(),
                        "warn": s.should_warn(),
                    })
                })
                .collect();
            Json(rows).into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub content_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionWebhook {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Transcription provider callback. The content id rides on the query
/// string we handed the provider at submit time.
pub async fn transcription_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    Json(payload): Json<TranscriptionWebhook>,
) -> Response {
    let transcript = if payload.status == "completed" {
        payload.text.unwrap_or_default()
    } else {
        // A failed job resumes with empty text, which records the failure.
        String::new()
    };
    match state.pipeline.resume_transcription(&query.content_id, &transcript).await {
        Ok(outcome) => Json(ProcessResponse::from(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}
