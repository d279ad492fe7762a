//! # Error Handling
//!
//! Two layers of errors live here:
//!
//! 1. **Collaborator errors** (`ExtractError`, `TranscribeError`, `AnswerError`,
//!    `TtsError`, `StoreError`): typed failures returned by the external
//!    collaborators behind their trait seams. Callers decide per-site whether
//!    a failure is surfaced, degraded, or swallowed.
//! 2. **`AppError`**: the HTTP-facing error type. Implements
//!    `actix_web::ResponseError` so handlers can return `Result<_, AppError>`
//!    and get a consistent JSON error envelope.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Failure extracting text from an uploaded CV file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file extension is not one we accept at all.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The document could not be parsed as its declared format.
    #[error("could not parse {kind} file: {reason}")]
    Parse { kind: String, reason: String },

    #[error("could not extract any text from the file")]
    Empty,
}

/// Failure from the speech-to-text collaborator.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Could not reach the transcription endpoint (connect, timeout).
    #[error("transcription request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("transcription API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected transcription response: {0}")]
    Malformed(String),
}

/// Failure from the answer-generation collaborator.
///
/// The distinction matters to the session state machine: `Transport` means
/// the call itself never completed (error event, nothing persisted), while
/// `Upstream` means the LLM side failed and the caller degrades to an
/// apology answer instead.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answer request failed: {0}")]
    Transport(reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected LLM response: {0}")]
    Malformed(String),
}

/// Failure from the speech-synthesis collaborator.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("TTS request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("TTS API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Failure from the interview store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(i64),

    /// Q&A records are append-only while a session is active.
    #[error("session {0} has already ended")]
    SessionEnded(i64),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// HTTP-facing application error with a JSON response envelope.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client sent invalid or malformed data (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Requested resource doesn't exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected server-side failure (500).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(_) => AppError::NotFound(err.to_string()),
            StoreError::SessionEnded(_) => AppError::BadRequest(err.to_string()),
            StoreError::Database(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<TtsError> for AppError {
    fn from(err: TtsError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Shorthand for handler results.
pub type AppResult<T> = Result<T, AppError>;
