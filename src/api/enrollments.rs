use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, EntityId};
use crate::api::guards::{Enrollments, Permitted};
use crate::api::validation::{does_not_exist, present, FieldReport, WriteMode};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::schemas::enrollment::{EnrollmentPayload, EnrollmentResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(create_enrollment))
        .route("/create", post(create_enrollment))
        .route(
            "/:enrollment_id",
            get(get_enrollment)
                .put(replace_enrollment)
                .patch(patch_enrollment)
                .delete(delete_enrollment),
        )
        .route("/:enrollment_id/update", put(replace_enrollment).patch(patch_enrollment))
        .route("/:enrollment_id/delete", delete(delete_enrollment))
}

async fn list_enrollments(
    actor: Permitted<Enrollments>,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrollmentResponse>>, ApiError> {
    let enrollments = repositories::enrollments::list_for_student(state.db(), actor.user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(enrollments.into_iter().map(EnrollmentResponse::from_db).collect()))
}

async fn get_enrollment(
    actor: Permitted<Enrollments>,
    State(state): State<AppState>,
    EntityId(enrollment_id): EntityId,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment =
        repositories::enrollments::find_for_student(state.db(), enrollment_id, actor.user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
            .ok_or_else(ApiError::not_found)?;

    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn create_enrollment(
    actor: Permitted<Enrollments>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollmentPayload>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    let checked = check_payload(&state, payload, WriteMode::Create).await?;
    let module_id = present("module", checked.module_id)?;

    let enrollment = repositories::enrollments::create(
        state.db(),
        repositories::enrollments::CreateEnrollment {
            student_id: actor.user.id,
            module_id,
            progress: checked.progress.unwrap_or(0.0),
            status: checked.status.unwrap_or_default(),
            enrolled_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| write_error(e, "Failed to create enrollment"))?;

    tracing::info!(
        actor_id = actor.user.id,
        enrollment_id = enrollment.id,
        module_id,
        action = "enrollment_create",
        "Enrollment created"
    );
    metrics::record_write("enrollment", "create");

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from_db(enrollment))))
}

async fn replace_enrollment(
    actor: Permitted<Enrollments>,
    state: State<AppState>,
    enrollment_id: EntityId,
    ApiJson(payload): ApiJson<EnrollmentPayload>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    update_enrollment(actor, state, enrollment_id, payload, WriteMode::Replace).await
}

async fn patch_enrollment(
    actor: Permitted<Enrollments>,
    state: State<AppState>,
    enrollment_id: EntityId,
    ApiJson(payload): ApiJson<EnrollmentPayload>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    update_enrollment(actor, state, enrollment_id, payload, WriteMode::Partial).await
}

async fn update_enrollment(
    actor: Permitted<Enrollments>,
    State(state): State<AppState>,
    EntityId(enrollment_id): EntityId,
    payload: EnrollmentPayload,
    mode: WriteMode,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    repositories::enrollments::find_for_student(state.db(), enrollment_id, actor.user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(ApiError::not_found)?;

    let checked = check_payload(&state, payload, mode).await?;

    let enrollment = repositories::enrollments::update_for_student(
        state.db(),
        enrollment_id,
        actor.user.id,
        repositories::enrollments::UpdateEnrollment {
            module_id: checked.module_id,
            progress: checked.progress,
            status: checked.status,
        },
    )
    .await
    .map_err(|e| write_error(e, "Failed to update enrollment"))?
    .ok_or_else(ApiError::not_found)?;

    tracing::info!(
        actor_id = actor.user.id,
        enrollment_id,
        progress = enrollment.progress,
        status = %enrollment.status,
        action = "enrollment_update",
        "Enrollment updated"
    );
    metrics::record_write("enrollment", "update");

    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn delete_enrollment(
    actor: Permitted<Enrollments>,
    State(state): State<AppState>,
    EntityId(enrollment_id): EntityId,
) -> Result<StatusCode, ApiError> {
    let deleted =
        repositories::enrollments::delete_for_student(state.db(), enrollment_id, actor.user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete enrollment"))?;
    if !deleted {
        return Err(ApiError::not_found());
    }

    tracing::info!(
        actor_id = actor.user.id,
        enrollment_id,
        action = "enrollment_delete",
        "Enrollment deleted"
    );
    metrics::record_write("enrollment", "delete");

    Ok(StatusCode::NO_CONTENT)
}

struct CheckedEnrollment {
    module_id: Option<i64>,
    progress: Option<f64>,
    status: Option<EnrollmentStatus>,
}

/// Only `module` is required on full writes; `progress` and `status` fall
/// back to their defaults.
async fn check_payload(
    state: &AppState,
    payload: EnrollmentPayload,
    mode: WriteMode,
) -> Result<CheckedEnrollment, ApiError> {
    let mut report = FieldReport::of(&payload);
    report.require(mode, "module", &payload.module);
    let status: Option<EnrollmentStatus> = report.choice("status", payload.status.as_deref());

    if let Some(module_id) = payload.module {
        let exists = repositories::modules::exists(state.db(), module_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch module"))?;
        if !exists {
            report.add("module", does_not_exist(module_id));
        }
    }

    report.finish()?;

    Ok(CheckedEnrollment { module_id: payload.module, progress: payload.progress, status })
}

/// The module can vanish between the existence check and the write.
fn write_error(error: sqlx::Error, context: &str) -> ApiError {
    match db::foreign_key_violation(&error) {
        Some("enrollments_module_id_fkey") => {
            ApiError::validation("module", "Referenced module no longer exists.")
        }
        _ => ApiError::internal(error, context),
    }
}

#[cfg(test)]
mod tests;
