use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use polsum_core::SourceDocument;

use crate::models::{ErrorResponse, UploadResponse};
use crate::state::AppState;
use crate::upload;

/// Accept a policy document, create the pending record, and kick off the
/// background job. Returns immediately; clients poll the status route.
pub async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let file = match upload::parse_multipart(multipart).await {
        Ok(file) => file,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response();
        }
    };

    let record = state.store.create_document(&file.filename, file.media_type);
    let source = SourceDocument::new(file.filename, file.media_type, file.data);

    if let Err(e) = state.runner.spawn(record.id, source) {
        // Fresh ids can't collide in practice; surface it all the same.
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }

    (
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            document_id: record.id,
            status: "pending",
        }),
    )
        .into_response()
}
