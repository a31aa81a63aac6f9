use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, EntityId};
use crate::api::guards::{Modules, Permitted};
use crate::api::validation::{
    does_not_exist, non_empty, present, trimmed, FieldReport, WriteMode,
};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::repositories;
use crate::repositories::listing;
use crate::schemas::module::{ModuleListQuery, ModulePayload, ModuleResponse};

const ORDER_TAKEN: &str = "The fields course, order_number must make a unique set.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules).post(create_module))
        .route("/create", post(create_module))
        .route(
            "/:module_id",
            get(get_module).put(replace_module).patch(patch_module).delete(delete_module),
        )
        .route("/:module_id/update", put(replace_module).patch(patch_module))
        .route("/:module_id/delete", delete(delete_module))
}

async fn list_modules(
    _actor: Permitted<Modules>,
    State(state): State<AppState>,
    Query(query): Query<ModuleListQuery>,
) -> Result<Json<Vec<ModuleResponse>>, ApiError> {
    let mut report = FieldReport::default();
    let author_id = report.id_filter("author", query.author.as_deref());
    let course_id = report.id_filter("course", query.course.as_deref());
    report.finish()?;

    let modules = repositories::modules::list(
        state.db(),
        repositories::modules::ListModules {
            title: non_empty(query.title),
            author_id,
            course_id,
            search: listing::search_patterns(query.search.as_deref()),
            ordering: listing::parse_ordering(
                query.ordering.as_deref(),
                repositories::modules::ORDERING_FIELDS,
            ),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list modules"))?;

    Ok(Json(modules.into_iter().map(ModuleResponse::from_db).collect()))
}

async fn get_module(
    _actor: Permitted<Modules>,
    State(state): State<AppState>,
    EntityId(module_id): EntityId,
) -> Result<Json<ModuleResponse>, ApiError> {
    let module = repositories::modules::find_by_id(state.db(), module_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch module"))?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(ModuleResponse::from_db(module)))
}

async fn create_module(
    actor: Permitted<Modules>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ModulePayload>,
) -> Result<(StatusCode, Json<ModuleResponse>), ApiError> {
    let checked = check_payload(&state, payload, WriteMode::Create).await?;
    let title = present("title", checked.title)?;
    let description = present("description", checked.description)?;
    let materials = checked.materials.unwrap_or_default();

    let module = repositories::modules::create(
        state.db(),
        repositories::modules::CreateModule {
            order_number: present("order_number", checked.order_number)?,
            title: &title,
            description: &description,
            course_id: present("course", checked.course_id)?,
            author_id: actor.user.id,
            materials: &materials,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| write_error(e, "Failed to create module"))?;

    tracing::info!(
        actor_id = actor.user.id,
        module_id = module.id,
        course_id = module.course_id,
        action = "module_create",
        "Module created"
    );
    metrics::record_write("module", "create");

    Ok((StatusCode::CREATED, Json(ModuleResponse::from_db(module))))
}

async fn replace_module(
    actor: Permitted<Modules>,
    state: State<AppState>,
    module_id: EntityId,
    ApiJson(payload): ApiJson<ModulePayload>,
) -> Result<Json<ModuleResponse>, ApiError> {
    update_module(actor, state, module_id, payload, WriteMode::Replace).await
}

async fn patch_module(
    actor: Permitted<Modules>,
    state: State<AppState>,
    module_id: EntityId,
    ApiJson(payload): ApiJson<ModulePayload>,
) -> Result<Json<ModuleResponse>, ApiError> {
    update_module(actor, state, module_id, payload, WriteMode::Partial).await
}

async fn update_module(
    actor: Permitted<Modules>,
    State(state): State<AppState>,
    EntityId(module_id): EntityId,
    payload: ModulePayload,
    mode: WriteMode,
) -> Result<Json<ModuleResponse>, ApiError> {
    let exists = repositories::modules::exists(state.db(), module_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch module"))?;
    if !exists {
        return Err(ApiError::not_found());
    }

    let checked = check_payload(&state, payload, mode).await?;

    let module = repositories::modules::update(
        state.db(),
        module_id,
        repositories::modules::UpdateModule {
            order_number: checked.order_number,
            title: checked.title,
            description: checked.description,
            course_id: checked.course_id,
            materials: checked.materials,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| write_error(e, "Failed to update module"))?
    .ok_or_else(ApiError::not_found)?;

    tracing::info!(
        actor_id = actor.user.id,
        module_id = module.id,
        action = "module_update",
        "Module updated"
    );
    metrics::record_write("module", "update");

    Ok(Json(ModuleResponse::from_db(module)))
}

async fn delete_module(
    actor: Permitted<Modules>,
    State(state): State<AppState>,
    EntityId(module_id): EntityId,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::modules::delete(state.db(), module_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete module"))?;
    if !deleted {
        return Err(ApiError::not_found());
    }

    tracing::info!(actor_id = actor.user.id, module_id, action = "module_delete", "Module deleted");
    metrics::record_write("module", "delete");

    Ok(StatusCode::NO_CONTENT)
}

struct CheckedModule {
    order_number: Option<i32>,
    title: Option<String>,
    description: Option<String>,
    course_id: Option<i64>,
    materials: Option<Vec<i64>>,
}

/// Field checks first, then the references they name; every problem lands
/// in one report.
async fn check_payload(
    state: &AppState,
    payload: ModulePayload,
    mode: WriteMode,
) -> Result<CheckedModule, ApiError> {
    let payload = ModulePayload {
        title: trimmed(payload.title),
        description: trimmed(payload.description),
        ..payload
    };

    let mut report = FieldReport::of(&payload);
    report.require(mode, "order_number", &payload.order_number);
    report.require(mode, "title", &payload.title);
    report.require(mode, "description", &payload.description);
    report.require(mode, "course", &payload.course);
    report.not_blank("title", &payload.title);
    report.not_blank("description", &payload.description);

    if let Some(course_id) = payload.course {
        let exists = repositories::courses::exists(state.db(), course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
        if !exists {
            report.add("course", does_not_exist(course_id));
        }
    }

    if let Some(materials) = payload.materials.as_deref() {
        let missing = repositories::modules::missing_material_ids(state.db(), materials)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch materials"))?;
        for material_id in missing {
            report.add("materials", does_not_exist(material_id));
        }
    }

    report.finish()?;

    let order_number = match payload.order_number {
        Some(value) => Some(i32::try_from(value).map_err(|_| {
            ApiError::validation("order_number", "Ensure this value is between 1 and 2147483647.")
        })?),
        None => None,
    };

    Ok(CheckedModule {
        order_number,
        title: payload.title,
        description: payload.description,
        course_id: payload.course,
        materials: payload.materials.map(dedup_keep_order),
    })
}

fn dedup_keep_order(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// `(course, order_number)` clashes and vanished references are client errors.
fn write_error(error: sqlx::Error, context: &str) -> ApiError {
    if db::unique_violation(&error) == Some(repositories::modules::COURSE_ORDER_CONSTRAINT) {
        return ApiError::Conflict { field: "non_field_errors", message: ORDER_TAKEN.to_string() };
    }
    match db::foreign_key_violation(&error) {
        Some("educational_modules_course_id_fkey") => {
            ApiError::validation("course", "Referenced course no longer exists.")
        }
        Some("module_materials_material_id_fkey") => {
            ApiError::validation("materials", "Referenced material no longer exists.")
        }
        _ => ApiError::internal(error, context),
    }
}
