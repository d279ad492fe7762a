//! Health check endpoint.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "service": {
            "name": "interview-copilot",
            "version": env!("CARGO_PKG_VERSION"),
            "host": state.config.server.host,
            "port": state.config.server.port
        },
        "cv": {
            "loaded": state.cv_contexts.has_context(crate::cv::DEFAULT_OWNER)
        },
        "models": {
            "transcription": state.config.transcription.model,
            "llm": state.config.llm.model
        }
    }))
}
