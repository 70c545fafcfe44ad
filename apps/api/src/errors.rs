use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::orchestrator::AnalysisError;
use crate::extraction::ExtractionError;
use crate::session::models::SessionId;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Caller-facing codes are stable; internal detail is logged, never returned.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document unreadable: {0}")]
    DocumentUnreadable(#[from] ExtractionError),

    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Session expired: {0}")]
    SessionExpired(SessionId),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::EmptyInput(e) => AppError::Validation(e.to_string()),
            AnalysisError::Generation { .. } => AppError::AnalysisUnavailable(err.to_string()),
            AnalysisError::Validation { .. } => AppError::AnalysisFailed(err.to_string()),
            AnalysisError::Session(e) => e.into(),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => AppError::SessionExpired(id),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DocumentUnreadable(_) => "DOCUMENT_UNREADABLE",
            AppError::AnalysisUnavailable(_) => "ANALYSIS_UNAVAILABLE",
            AppError::AnalysisFailed(_) => "ANALYSIS_FAILED",
            AppError::SessionExpired(_) => "SESSION_EXPIRED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DocumentUnreadable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AnalysisUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AnalysisFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::SessionExpired(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::DocumentUnreadable(e) => {
                tracing::warn!("Document extraction failed: {e}");
                "could not read document".to_string()
            }
            AppError::AnalysisUnavailable(detail) => {
                tracing::error!("Analysis unavailable: {detail}");
                "analysis service unavailable".to_string()
            }
            AppError::AnalysisFailed(detail) => {
                tracing::error!("Analysis failed: {detail}");
                "analysis failed, please try again".to_string()
            }
            AppError::SessionExpired(id) => {
                tracing::debug!("Request for unknown or expired session {id}");
                "session expired, please restart".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::analysis::normalizer::{EmptyInput, InputField};
    use crate::analysis::validator::ValidationError;
    use crate::llm_client::GenerationError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_analysis_errors_map_to_stable_codes() {
        let cases = [
            (
                AnalysisError::EmptyInput(EmptyInput(InputField::JobDescription)),
                "VALIDATION_ERROR",
            ),
            (
                AnalysisError::Generation {
                    attempts: 3,
                    source: GenerationError::Timeout,
                },
                "ANALYSIS_UNAVAILABLE",
            ),
            (
                AnalysisError::Generation {
                    attempts: 1,
                    source: GenerationError::AuthFailure("bad key".into()),
                },
                "ANALYSIS_UNAVAILABLE",
            ),
            (
                AnalysisError::Validation {
                    attempts: 3,
                    source: ValidationError::Malformed("no JSON object".into()),
                },
                "ANALYSIS_FAILED",
            ),
            (
                AnalysisError::Session(SessionError::NotFound(Uuid::new_v4())),
                "SESSION_EXPIRED",
            ),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).code(), code);
        }
    }

    #[tokio::test]
    async fn test_internal_detail_is_not_exposed() {
        let err = AppError::from(AnalysisError::Generation {
            attempts: 1,
            source: GenerationError::AuthFailure("key AIza-secret revoked".into()),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "ANALYSIS_UNAVAILABLE");
        assert_eq!(body["error"]["message"], "analysis service unavailable");
        assert!(!body.to_string().contains("AIza"));
    }

    #[tokio::test]
    async fn test_expired_session_response() {
        let response = AppError::SessionExpired(Uuid::new_v4()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "session expired, please restart");
    }

    #[tokio::test]
    async fn test_validation_message_names_the_field() {
        let err = AppError::from(AnalysisError::EmptyInput(EmptyInput(InputField::Resume)));
        let body = body_json(err.into_response()).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["error"]["message"],
            "resume_text is empty after normalization"
        );
    }

    #[test]
    fn test_extraction_failure_is_unprocessable() {
        let err = AppError::from(ExtractionError::NoText);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "DOCUMENT_UNREADABLE");
    }
}
