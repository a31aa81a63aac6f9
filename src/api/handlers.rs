use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};
use crate::services::storage::StorageError;

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    let response = RootResponse {
        message: api.project_name.clone(),
        version: api.version.clone(),
        docs_url: format!("{}/docs", api.api_v1_str),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match repositories::health::ping(state.db()).await {
        Ok(_) => {
            components.insert("database".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    Json(HealthResponse { service: "lm-platform".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Serves a stored upload to any authenticated actor.
pub(crate) async fn media_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    match state.storage().read(&path).await {
        Ok((bytes, mime)) => Ok(([(header::CONTENT_TYPE, mime)], bytes).into_response()),
        Err(StorageError::NotFound) => Err(ApiError::not_found()),
        Err(StorageError::InvalidRelativePath | StorageError::PathOutsideRoot) => {
            tracing::warn!(actor_id = user.id, path = %path, "Rejected media path");
            Err(ApiError::Forbidden("Access to this path is not allowed."))
        }
        Err(StorageError::Io(error)) => Err(ApiError::internal(error, "Failed to read media file")),
    }
}
