use std::marker::PhantomData;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::repositories;
use crate::services::access_policy::{self, Access, Action, Resource};

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";
const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
const NOT_PERMITTED: &str = "You do not have permission to perform this action.";

/// The actor behind the request, if any. A missing `Authorization` header is
/// anonymous; a header that does not resolve to an active user is rejected.
pub(crate) struct MaybeUser(pub(crate) Option<User>);

/// An authenticated actor of any role.
pub(crate) struct CurrentUser(pub(crate) User);

/// An actor that passed the role policy for `R` and the request method.
pub(crate) struct Permitted<R> {
    pub(crate) user: User,
    _resource: PhantomData<R>,
}

pub(crate) trait ResourceMarker {
    const RESOURCE: Resource;
}

pub(crate) struct Courses;
pub(crate) struct Modules;
pub(crate) struct Materials;
pub(crate) struct Enrollments;
pub(crate) struct Users;

impl ResourceMarker for Courses {
    const RESOURCE: Resource = Resource::Course;
}
impl ResourceMarker for Modules {
    const RESOURCE: Resource = Resource::Module;
}
impl ResourceMarker for Materials {
    const RESOURCE: Resource = Resource::Material;
}
impl ResourceMarker for Enrollments {
    const RESOURCE: Resource = Resource::Enrollment;
}
impl ResourceMarker for Users {
    const RESOURCE: Resource = Resource::User;
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(MaybeUser(None));
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;
        let user_id = claims.user_id().ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        let user = repositories::users::find_by_id(app_state.db(), user_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
        }

        Ok(MaybeUser(Some(user)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(CurrentUser).ok_or(ApiError::Unauthorized(NOT_AUTHENTICATED))
    }
}

#[async_trait]
impl<R> FromRequestParts<AppState> for Permitted<R>
where
    R: ResourceMarker + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        let action = Action::from_method(&parts.method);

        match access_policy::authorize(user.as_ref(), R::RESOURCE, action) {
            Access::Granted => match user {
                Some(user) => Ok(Permitted { user, _resource: PhantomData }),
                None => Err(ApiError::Unauthorized(NOT_AUTHENTICATED)),
            },
            Access::Unauthenticated => Err(ApiError::Unauthorized(NOT_AUTHENTICATED)),
            Access::Denied => {
                if let Some(user) = &user {
                    tracing::info!(
                        actor_id = user.id,
                        role = %user.role,
                        resource = R::RESOURCE.as_str(),
                        method = %parts.method,
                        "Access denied by role policy"
                    );
                }
                Err(ApiError::Forbidden(NOT_PERMITTED))
            }
        }
    }
}
