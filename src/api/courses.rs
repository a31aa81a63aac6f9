use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, EntityId};
use crate::api::guards::{Courses, Permitted};
use crate::api::validation::{non_empty, present, trimmed, FieldReport, WriteMode};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::listing;
use crate::schemas::course::{CourseListQuery, CoursePayload, CourseResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/create", post(create_course))
        .route(
            "/:course_id",
            get(get_course).put(replace_course).patch(patch_course).delete(delete_course),
        )
        .route("/:course_id/update", put(replace_course).patch(patch_course))
        .route("/:course_id/delete", delete(delete_course))
}

async fn list_courses(
    _actor: Permitted<Courses>,
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let mut report = FieldReport::default();
    let teacher_id = report.id_filter("teacher", query.teacher.as_deref());
    report.finish()?;

    let courses = repositories::courses::list(
        state.db(),
        repositories::courses::ListCourses {
            title: non_empty(query.title),
            teacher_id,
            search: listing::search_patterns(query.search.as_deref()),
            ordering: listing::parse_ordering(
                query.ordering.as_deref(),
                repositories::courses::ORDERING_FIELDS,
            ),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn get_course(
    _actor: Permitted<Courses>,
    State(state): State<AppState>,
    EntityId(course_id): EntityId,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(CourseResponse::from_db(course)))
}

async fn create_course(
    actor: Permitted<Courses>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CoursePayload>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let payload = check_payload(payload, WriteMode::Create)?;
    let title = present("title", payload.title)?;
    let description = present("description", payload.description)?;

    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            title: &title,
            description: &description,
            teacher_id: actor.user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    tracing::info!(
        actor_id = actor.user.id,
        course_id = course.id,
        action = "course_create",
        "Course created"
    );
    metrics::record_write("course", "create");

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn replace_course(
    actor: Permitted<Courses>,
    state: State<AppState>,
    course_id: EntityId,
    ApiJson(payload): ApiJson<CoursePayload>,
) -> Result<Json<CourseResponse>, ApiError> {
    update_course(actor, state, course_id, payload, WriteMode::Replace).await
}

async fn patch_course(
    actor: Permitted<Courses>,
    state: State<AppState>,
    course_id: EntityId,
    ApiJson(payload): ApiJson<CoursePayload>,
) -> Result<Json<CourseResponse>, ApiError> {
    update_course(actor, state, course_id, payload, WriteMode::Partial).await
}

async fn update_course(
    actor: Permitted<Courses>,
    State(state): State<AppState>,
    EntityId(course_id): EntityId,
    payload: CoursePayload,
    mode: WriteMode,
) -> Result<Json<CourseResponse>, ApiError> {
    let exists = repositories::courses::exists(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    if !exists {
        return Err(ApiError::not_found());
    }

    let payload = check_payload(payload, mode)?;

    let course = repositories::courses::update(
        state.db(),
        course_id,
        repositories::courses::UpdateCourse {
            title: payload.title,
            description: payload.description,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?
    .ok_or_else(ApiError::not_found)?;

    tracing::info!(
        actor_id = actor.user.id,
        course_id = course.id,
        action = "course_update",
        "Course updated"
    );
    metrics::record_write("course", "update");

    Ok(Json(CourseResponse::from_db(course)))
}

async fn delete_course(
    actor: Permitted<Courses>,
    State(state): State<AppState>,
    EntityId(course_id): EntityId,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::courses::delete(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?;
    if !deleted {
        return Err(ApiError::not_found());
    }

    tracing::info!(actor_id = actor.user.id, course_id, action = "course_delete", "Course deleted");
    metrics::record_write("course", "delete");

    Ok(StatusCode::NO_CONTENT)
}

fn check_payload(payload: CoursePayload, mode: WriteMode) -> Result<CoursePayload, ApiError> {
    let payload = CoursePayload {
        title: trimmed(payload.title),
        description: trimmed(payload.description),
    };

    let mut report = FieldReport::of(&payload);
    report.require(mode, "title", &payload.title);
    report.require(mode, "description", &payload.description);
    report.not_blank("title", &payload.title);
    report.not_blank("description", &payload.description);
    report.finish()?;

    Ok(payload)
}
