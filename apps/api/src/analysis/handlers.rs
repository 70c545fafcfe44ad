//! Axum route handlers for the Analysis and Session APIs.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::models::{AnalysisRequest, AnalysisResult};
use crate::analysis::orchestrator::{AnalysisOutcome, ChatReply};
use crate::analysis::validator::{Classification, Coercion};
use crate::errors::AppError;
use crate::session::models::{ChatContext, SessionId};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub chars: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub session_id: SessionId,
    pub result: AnalysisResult,
    /// True when the validator had to repair the model output.
    pub partial: bool,
    pub coercions: Vec<Coercion>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/documents/extract
///
/// Accepts a multipart upload (field `file`) and returns its plain text.
pub async fn handle_extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let text = state
            .extractor
            .extract_text(bytes.to_vec(), filename.as_deref())
            .await?;
        let chars = text.chars().count();
        info!("Extracted {chars} chars from uploaded document");
        return Ok(Json(ExtractResponse { text, chars }));
    }

    Err(AppError::Validation(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// POST /api/v1/analysis
///
/// Runs one analysis and opens a coaching session anchored to its result.
pub async fn handle_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let Json(request) = payload?;

    let AnalysisOutcome { input, analysis } = state.orchestrator.analyze(&request).await?;
    let partial = analysis.classification == Classification::Partial;

    let session_id = state
        .sessions
        .create_session(input.resume.text, analysis.result.clone());
    info!(
        "Session {session_id} opened (score {:.1}, partial: {partial})",
        analysis.result.score
    );

    Ok(Json(AnalysisResponse {
        session_id,
        result: analysis.result,
        partial,
        coercions: analysis.coercions,
    }))
}

/// POST /api/v1/sessions/:id/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    path: Result<Path<SessionId>, PathRejection>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Path(session_id) = path?;
    let Json(request) = payload?;

    let reply = state
        .orchestrator
        .chat(&state.sessions, session_id, &request.message)
        .await?;
    Ok(Json(reply))
}

/// GET /api/v1/sessions/:id
///
/// Returns the session anchor and stored history. Counts as session activity.
pub async fn handle_get_session(
    State(state): State<AppState>,
    path: Result<Path<SessionId>, PathRejection>,
) -> Result<Json<ChatContext>, AppError> {
    let Path(session_id) = path?;
    Ok(Json(state.sessions.get_context(session_id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    path: Result<Path<SessionId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(session_id) = path?;
    state.sessions.remove(session_id)?;
    info!("Session {session_id} closed by client");
    Ok(StatusCode::NO_CONTENT)
}
