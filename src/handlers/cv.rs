//! CV upload and context endpoints.
//!
//! - `POST /api/cv/upload` - multipart upload, text extraction, summary
//!   derivation, context storage.
//! - `GET /api/cv/context` - current context with a truncated text preview.
//! - `DELETE /api/cv/clear` - drop the stored context.

use crate::cv::extract::file_extension;
use crate::cv::{DEFAULT_OWNER, SUPPORTED_EXTENSIONS};
use crate::cv::context::summarize;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::{StreamExt, TryStreamExt};
use serde_json::json;
use tracing::info;

/// Preview length for echoing extracted text back to the uploader.
const UPLOAD_PREVIEW_CHARS: usize = 500;

/// Preview length for the context endpoint.
const CONTEXT_PREVIEW_CHARS: usize = 1_000;

fn preview(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }
    let mut cut = max_chars;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

pub async fn upload_cv(
    mut payload: Multipart,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let max_bytes = state.config.limits.max_cv_bytes;

    // Pull the first file field from the multipart body.
    let mut field = loop {
        match payload.try_next().await {
            Ok(Some(field)) if field.content_disposition().and_then(|cd| cd.get_filename()).is_some() => {
                break field;
            }
            Ok(Some(_)) => continue,
            Ok(None) => return Err(AppError::BadRequest("No file provided".to_string())),
            Err(err) => {
                return Err(AppError::BadRequest(format!("Invalid multipart body: {}", err)))
            }
        }
    };

    let filename = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("No filename provided".to_string()))?;

    let extension = file_extension(&filename);
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported file type. Supported: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let mut content = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk
            .map_err(|err| AppError::BadRequest(format!("Failed to read upload: {}", err)))?;
        if content.len() + chunk.len() > max_bytes {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {}MB.",
                max_bytes / (1024 * 1024)
            )));
        }
        content.extend_from_slice(&chunk);
    }

    let extracted_text = state.extractor.extract(&content, &filename)?;
    let summary = summarize(&extracted_text);

    state.cv_contexts.set(
        DEFAULT_OWNER,
        filename.clone(),
        extracted_text.clone(),
        Some(summary.clone()),
    );

    info!(filename = %filename, chars = extracted_text.len(), "CV uploaded");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "CV uploaded and processed successfully",
        "filename": filename,
        "extracted_text": preview(&extracted_text, UPLOAD_PREVIEW_CHARS),
        "summary": summary
    })))
}

pub async fn get_cv_context(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let Some(context) = state.cv_contexts.get(DEFAULT_OWNER) else {
        return Ok(HttpResponse::Ok().json(json!({ "has_cv": false })));
    };

    Ok(HttpResponse::Ok().json(json!({
        "has_cv": true,
        "filename": context.filename,
        "extracted_text": preview(&context.full_text, CONTEXT_PREVIEW_CHARS),
        "summary": context.summary,
        "uploaded_at": context.uploaded_at.to_rfc3339()
    })))
}

pub async fn clear_cv_context(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    state.cv_contexts.clear(DEFAULT_OWNER);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "CV context cleared"
    })))
}
