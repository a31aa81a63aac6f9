use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, EntityId};
use crate::api::guards::{Permitted, Users};
use crate::api::validation::{
    present, trimmed, validate_password_len, validate_username, FieldReport, WriteMode,
};
use crate::core::metrics;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::db::models::UserProfile;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{UserListQuery, UserPayload, UserResponse};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/create", post(create_user))
        .route(
            "/:user_id",
            get(get_user).put(replace_user).patch(patch_user).delete(delete_user),
        )
        .route("/:user_id/update", put(replace_user).patch(patch_user))
        .route("/:user_id/delete", delete(delete_user))
}

async fn list_users(
    _actor: Permitted<Users>,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    // An unknown role matches no user, so it lists nothing instead of failing.
    let role = match query.role.as_deref().filter(|role| !role.is_empty()) {
        Some(raw) => match raw.parse::<UserRole>() {
            Ok(role) => Some(role),
            Err(_) => return Ok(Json(Vec::new())),
        },
        None => None,
    };

    let users = repositories::users::list_profiles(state.db(), role)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

async fn get_user(
    _actor: Permitted<Users>,
    State(state): State<AppState>,
    EntityId(user_id): EntityId,
) -> Result<Json<UserResponse>, ApiError> {
    let profile = fetch_profile(&state, user_id).await?;
    Ok(Json(UserResponse::from_db(profile)))
}

async fn create_user(
    actor: Permitted<Users>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let checked = check_payload(payload, WriteMode::Create)?;
    let username = present("username", checked.username)?;
    let email = present("email", checked.email)?;
    let password = present("password", checked.password)?;

    let hashed_password = security::hash_password(&password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            username: &username,
            email: &email,
            hashed_password,
            role: checked.role.unwrap_or_default(),
            is_active: checked.is_active.unwrap_or(true),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| write_error(e, "Failed to create user"))?;

    tracing::info!(
        admin_id = actor.user.id,
        user_id = user.id,
        role = %user.role,
        action = "user_create",
        "Admin created user"
    );
    metrics::record_write("user", "create");

    Ok((StatusCode::CREATED, Json(UserResponse::from_new_user(user))))
}

async fn replace_user(
    actor: Permitted<Users>,
    state: State<AppState>,
    user_id: EntityId,
    ApiJson(payload): ApiJson<UserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    update_user(actor, state, user_id, payload, WriteMode::Replace).await
}

async fn patch_user(
    actor: Permitted<Users>,
    state: State<AppState>,
    user_id: EntityId,
    ApiJson(payload): ApiJson<UserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    update_user(actor, state, user_id, payload, WriteMode::Partial).await
}

async fn update_user(
    actor: Permitted<Users>,
    State(state): State<AppState>,
    EntityId(user_id): EntityId,
    payload: UserPayload,
    mode: WriteMode,
) -> Result<Json<UserResponse>, ApiError> {
    repositories::users::find_by_id(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(ApiError::not_found)?;

    let checked = check_payload(payload, mode)?;

    let hashed_password = match checked.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };
    let password_changed = hashed_password.is_some();

    let updated = repositories::users::update(
        state.db(),
        user_id,
        repositories::users::UpdateUser {
            username: checked.username,
            email: checked.email,
            role: checked.role,
            is_active: checked.is_active,
            hashed_password,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| write_error(e, "Failed to update user"))?;
    if !updated {
        return Err(ApiError::not_found());
    }

    let profile = fetch_profile(&state, user_id).await?;

    tracing::info!(
        admin_id = actor.user.id,
        user_id,
        password_changed,
        action = "user_update",
        "Admin updated user"
    );
    metrics::record_write("user", "update");

    Ok(Json(UserResponse::from_db(profile)))
}

/// Deleting a user cascades to everything they authored, uploaded or
/// enrolled in; their uploaded files go with the material rows.
async fn delete_user(
    actor: Permitted<Users>,
    State(state): State<AppState>,
    EntityId(user_id): EntityId,
) -> Result<StatusCode, ApiError> {
    let file_paths = repositories::materials::file_paths_by_uploader(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list uploaded files"))?;

    let deleted = repositories::users::delete(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete user"))?;
    if !deleted {
        return Err(ApiError::not_found());
    }

    for path in &file_paths {
        if let Err(error) = state.storage().remove(path).await {
            tracing::warn!(error = %error, path = %path, "Failed to remove stored material file");
        }
    }

    tracing::info!(
        admin_id = actor.user.id,
        user_id,
        removed_files = file_paths.len(),
        action = "user_delete",
        "Admin deleted user"
    );
    metrics::record_write("user", "delete");

    Ok(StatusCode::NO_CONTENT)
}

struct CheckedUser {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<UserRole>,
    is_active: Option<bool>,
}

/// `password` is required only on create; a full replace may leave it out to
/// keep the current one.
fn check_payload(payload: UserPayload, mode: WriteMode) -> Result<CheckedUser, ApiError> {
    let payload = UserPayload {
        username: trimmed(payload.username),
        email: trimmed(payload.email),
        ..payload
    };

    let mut report = FieldReport::of(&payload);
    report.require(mode, "username", &payload.username);
    report.require(mode, "email", &payload.email);
    if mode == WriteMode::Create {
        report.require(mode, "password", &payload.password);
    }
    report.not_blank("username", &payload.username);
    report.not_blank("email", &payload.email);
    report.not_blank("password", &payload.password);

    if let Some(username) = payload.username.as_deref() {
        if let Err(message) = validate_username(username) {
            report.add("username", message);
        }
    }
    if let Some(password) = payload.password.as_deref() {
        if !report.has("password") {
            if let Err(message) = validate_password_len(password) {
                report.add("password", message);
            }
        }
    }
    let role: Option<UserRole> = report.choice("role", payload.role.as_deref());

    report.finish()?;

    Ok(CheckedUser {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        role,
        is_active: payload.is_active,
    })
}

async fn fetch_profile(state: &AppState, user_id: i64) -> Result<UserProfile, ApiError> {
    repositories::users::find_profile(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(ApiError::not_found)
}

fn write_error(error: sqlx::Error, context: &str) -> ApiError {
    match db::unique_violation(&error) {
        Some(USERNAME_CONSTRAINT) => ApiError::Conflict {
            field: "username",
            message: "A user with that username already exists.".to_string(),
        },
        Some(EMAIL_CONSTRAINT) => ApiError::Conflict {
            field: "email",
            message: "user with this email already exists.".to_string(),
        },
        _ => ApiError::internal(error, context),
    }
}

#[cfg(test)]
mod tests;
