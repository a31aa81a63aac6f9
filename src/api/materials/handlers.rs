use axum::{extract::State, http::StatusCode, Json};

use super::form::{MaterialForm, Upload};
use crate::api::errors::ApiError;
use crate::api::extract::EntityId;
use crate::api::guards::{Materials, Permitted};
use crate::api::validation::{present, trimmed, validate_video_url, FieldReport, WriteMode};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Material;
use crate::db::types::MaterialType;
use crate::repositories;
use crate::schemas::material::{MaterialPayload, MaterialResponse};
use crate::services::storage::StoredFile;

pub(super) async fn list_materials(
    _actor: Permitted<Materials>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MaterialResponse>>, ApiError> {
    let materials = repositories::materials::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list materials"))?;

    Ok(Json(materials.into_iter().map(|material| respond(&state, material)).collect()))
}

pub(super) async fn get_material(
    _actor: Permitted<Materials>,
    State(state): State<AppState>,
    EntityId(material_id): EntityId,
) -> Result<Json<MaterialResponse>, ApiError> {
    let material = fetch_material(&state, material_id).await?;
    Ok(Json(respond(&state, material)))
}

pub(super) async fn create_material(
    actor: Permitted<Materials>,
    State(state): State<AppState>,
    form: MaterialForm,
) -> Result<(StatusCode, Json<MaterialResponse>), ApiError> {
    let checked = check_payload(&state, form.payload, WriteMode::Create, None)?;
    let title = present("title", checked.title)?;
    let content = present("content", checked.content)?;
    let material_type = present("type", checked.material_type)?;

    let stored = store_upload(&state, form.upload.as_ref()).await?;

    let created = repositories::materials::create(
        state.db(),
        repositories::materials::CreateMaterial {
            title: &title,
            content: &content,
            file_path: stored.as_ref().map(|file| file.path.as_str()),
            material_type,
            uploaded_by: actor.user.id,
            uploaded_at: primitive_now_utc(),
        },
    )
    .await;

    let material = match created {
        Ok(material) => material,
        Err(error) => {
            discard_upload(&state, stored.as_ref()).await;
            return Err(ApiError::internal(error, "Failed to create material"));
        }
    };

    tracing::info!(
        actor_id = actor.user.id,
        material_id = material.id,
        material_type = %material.material_type,
        file_sha256 = stored.as_ref().map(|file| file.sha256.as_str()),
        file_size = stored.as_ref().map(|file| file.size),
        action = "material_create",
        "Material created"
    );
    metrics::record_write("material", "create");

    Ok((StatusCode::CREATED, Json(respond(&state, material))))
}

pub(super) async fn replace_material(
    actor: Permitted<Materials>,
    state: State<AppState>,
    material_id: EntityId,
    form: MaterialForm,
) -> Result<Json<MaterialResponse>, ApiError> {
    update_material(actor, state, material_id, form, WriteMode::Replace).await
}

pub(super) async fn patch_material(
    actor: Permitted<Materials>,
    state: State<AppState>,
    material_id: EntityId,
    form: MaterialForm,
) -> Result<Json<MaterialResponse>, ApiError> {
    update_material(actor, state, material_id, form, WriteMode::Partial).await
}

async fn update_material(
    actor: Permitted<Materials>,
    State(state): State<AppState>,
    EntityId(material_id): EntityId,
    form: MaterialForm,
    mode: WriteMode,
) -> Result<Json<MaterialResponse>, ApiError> {
    let existing = fetch_material(&state, material_id).await?;
    let checked = check_payload(&state, form.payload, mode, Some(&existing))?;

    let stored = store_upload(&state, form.upload.as_ref()).await?;

    let updated = repositories::materials::update(
        state.db(),
        material_id,
        repositories::materials::UpdateMaterial {
            title: checked.title,
            content: checked.content,
            file_path: stored.as_ref().map(|file| file.path.clone()),
            material_type: checked.material_type,
        },
    )
    .await;

    let material = match updated {
        Ok(Some(material)) => material,
        Ok(None) => {
            discard_upload(&state, stored.as_ref()).await;
            return Err(ApiError::not_found());
        }
        Err(error) => {
            discard_upload(&state, stored.as_ref()).await;
            return Err(ApiError::internal(error, "Failed to update material"));
        }
    };

    if stored.is_some() {
        if let Some(previous) = existing.file_path.as_deref() {
            remove_file(&state, previous).await;
        }
    }

    tracing::info!(
        actor_id = actor.user.id,
        material_id = material.id,
        file_replaced = stored.is_some(),
        action = "material_update",
        "Material updated"
    );
    metrics::record_write("material", "update");

    Ok(Json(respond(&state, material)))
}

pub(super) async fn delete_material(
    actor: Permitted<Materials>,
    State(state): State<AppState>,
    EntityId(material_id): EntityId,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::materials::delete(state.db(), material_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete material"))?
        .ok_or_else(ApiError::not_found)?;

    if let Some(path) = deleted.file_path.as_deref() {
        remove_file(&state, path).await;
    }

    tracing::info!(
        actor_id = actor.user.id,
        material_id,
        action = "material_delete",
        "Material deleted"
    );
    metrics::record_write("material", "delete");

    Ok(StatusCode::NO_CONTENT)
}

struct CheckedMaterial {
    title: Option<String>,
    content: Option<String>,
    material_type: Option<MaterialType>,
}

/// `existing` supplies the fields a partial update leaves untouched, so the
/// video link rule sees the row as it will be stored.
fn check_payload(
    state: &AppState,
    payload: MaterialPayload,
    mode: WriteMode,
    existing: Option<&Material>,
) -> Result<CheckedMaterial, ApiError> {
    let payload = MaterialPayload {
        title: trimmed(payload.title),
        content: trimmed(payload.content),
        material_type: payload.material_type,
    };

    let mut report = FieldReport::of(&payload);
    report.require(mode, "title", &payload.title);
    report.require(mode, "content", &payload.content);
    report.require(mode, "type", &payload.material_type);
    report.not_blank("title", &payload.title);
    report.not_blank("content", &payload.content);
    let material_type: Option<MaterialType> =
        report.choice("type", payload.material_type.as_deref());

    if state.settings().materials().enforce_video_url && !report.has("content") {
        let effective_type = material_type.or(existing.map(|material| material.material_type));
        let effective_content = payload
            .content
            .as_deref()
            .or(existing.map(|material| material.content.as_str()));
        if let (Some(MaterialType::Video), Some(content)) = (effective_type, effective_content) {
            if let Err(message) = validate_video_url(content) {
                report.add("content", message);
            }
        }
    }

    report.finish()?;

    Ok(CheckedMaterial { title: payload.title, content: payload.content, material_type })
}

async fn fetch_material(state: &AppState, material_id: i64) -> Result<Material, ApiError> {
    repositories::materials::find_by_id(state.db(), material_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch material"))?
        .ok_or_else(ApiError::not_found)
}

async fn store_upload(
    state: &AppState,
    upload: Option<&Upload>,
) -> Result<Option<StoredFile>, ApiError> {
    let Some(upload) = upload else {
        return Ok(None);
    };
    state
        .storage()
        .save_material(&upload.file_name, &upload.bytes)
        .await
        .map(Some)
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))
}

async fn discard_upload(state: &AppState, stored: Option<&StoredFile>) {
    if let Some(stored) = stored {
        remove_file(state, &stored.path).await;
    }
}

async fn remove_file(state: &AppState, path: &str) {
    if let Err(error) = state.storage().remove(path).await {
        tracing::warn!(error = %error, path = %path, "Failed to remove stored material file");
    }
}

fn respond(state: &AppState, material: Material) -> MaterialResponse {
    MaterialResponse::from_db(material, |path| state.storage().public_url(path))
}
