use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use polsum_pipeline::RegenerateError;

use crate::models::{ErrorResponse, RegenerateResponse};
use crate::state::AppState;

pub async fn regenerate(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.runner.regenerate_summary(id).await {
        Ok(version) => Json(RegenerateResponse {
            version: version.version,
            text: version.text,
            options: version.options,
        })
        .into_response(),
        Err(e @ RegenerateError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ RegenerateError::AlreadyProcessing(_)) => error_response(StatusCode::CONFLICT, e),
        Err(e @ RegenerateError::NotReady(_)) => error_response(StatusCode::CONFLICT, e),
        Err(e @ RegenerateError::Store(_)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn error_response(status: StatusCode, e: RegenerateError) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}
