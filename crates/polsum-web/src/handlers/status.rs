use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::models::{ErrorResponse, StatusResponse};
use crate::state::AppState;

pub async fn status(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.store.get_document(id) {
        Some(record) => Json(StatusResponse::from(&record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("document {id} not found"),
            }),
        )
            .into_response(),
    }
}
