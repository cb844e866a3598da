use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use polsum_core::JobStatus;

use crate::models::{ErrorResponse, ResultResponse};
use crate::state::AppState;

pub async fn result(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    let Some(record) = state.store.get_document(id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("document {id} not found"),
            }),
        )
            .into_response();
    };

    if record.job.status != JobStatus::Succeeded {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("document is {}", record.job.status.as_str()),
            }),
        )
            .into_response();
    }

    Json(ResultResponse::from(&record)).into_response()
}
