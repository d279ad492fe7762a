//! Interview history endpoints: list, fetch, and delete persisted sessions.

use crate::error::{AppError, AppResult};
use crate::state::AppState;

use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn list_sessions(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.store.list_sessions()?))
}

pub async fn get_session(
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    let session = state
        .store
        .get_session(session_id)?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(HttpResponse::Ok().json(session))
}

pub async fn delete_session(
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    state.store.delete_session(session_id)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Session deleted"
    })))
}
