use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{User, UserProfile};
use crate::db::types::UserRole;

/// Body of user create/replace/patch. `password` is write-only.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct UserPayload {
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub(crate) username: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    pub(crate) role: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) authored_courses: Vec<i64>,
    pub(crate) authored_modules: Vec<i64>,
    pub(crate) enrolled_modules: Vec<i64>,
}

impl UserResponse {
    pub(crate) fn from_db(profile: UserProfile) -> Self {
        let UserProfile { user, authored_courses, authored_modules, enrolled_modules } = profile;
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            authored_courses,
            authored_modules,
            enrolled_modules,
        }
    }

    /// A freshly created account owns nothing yet.
    pub(crate) fn from_new_user(user: User) -> Self {
        Self::from_db(UserProfile {
            user,
            authored_courses: Vec::new(),
            authored_modules: Vec::new(),
            enrolled_modules: Vec::new(),
        })
    }
}
