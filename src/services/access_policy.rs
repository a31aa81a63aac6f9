use axum::http::Method;

use crate::db::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resource {
    Course,
    Module,
    Material,
    Enrollment,
    User,
}

impl Resource {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Module => "module",
            Self::Material => "material",
            Self::Enrollment => "enrollment",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Read,
    Write,
}

impl Action {
    pub(crate) fn from_method(method: &Method) -> Self {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            Self::Read
        } else {
            Self::Write
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Granted,
    /// No actor: maps to 401.
    Unauthenticated,
    /// Actor known but the role does not qualify: maps to 403.
    Denied,
}

/// Role check for one request; ownership scoping happens in the queries.
pub(crate) fn authorize(actor: Option<&User>, resource: Resource, action: Action) -> Access {
    let Some(actor) = actor else {
        return Access::Unauthenticated;
    };

    let granted = match resource {
        Resource::Course | Resource::Module | Resource::Material => match action {
            Action::Read => true,
            Action::Write => actor.is_teacher(),
        },
        Resource::Enrollment => actor.is_student(),
        Resource::User => actor.is_admin(),
    };

    if granted {
        Access::Granted
    } else {
        Access::Denied
    }
}
