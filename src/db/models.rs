use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{EnrollmentStatus, MaterialType, UserRole};

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
    #[serde(skip_serializing)]
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn is_teacher(&self) -> bool {
        self.role == UserRole::Teacher
    }

    pub(crate) fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A user row together with the ids of everything it authored or enrolled in.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserProfile {
    #[sqlx(flatten)]
    pub(crate) user: User,
    pub(crate) authored_courses: Vec<i64>,
    pub(crate) authored_modules: Vec<i64>,
    pub(crate) enrolled_modules: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) teacher_id: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct EducationalModule {
    pub(crate) id: i64,
    pub(crate) order_number: i32,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) course_id: i64,
    pub(crate) author_id: i64,
    pub(crate) materials: Vec<i64>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Material {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) file_path: Option<String>,
    pub(crate) material_type: MaterialType,
    pub(crate) uploaded_by: i64,
    pub(crate) uploaded_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) module_id: i64,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) progress: f64,
    pub(crate) status: EnrollmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn user_with(role: UserRole) -> User {
        let now = primitive_now_utc();
        User {
            id: 1,
            username: "someone".to_string(),
            email: "someone@test.com".to_string(),
            hashed_password: String::new(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exactly_one_capability_holds_per_role() {
        for role in [UserRole::Student, UserRole::Teacher, UserRole::Admin] {
            let user = user_with(role);
            let flags = [user.is_student(), user.is_teacher(), user.is_admin()];
            assert_eq!(flags.iter().filter(|flag| **flag).count(), 1, "role {role}");
        }
        assert!(user_with(UserRole::Teacher).is_teacher());
        assert!(user_with(UserRole::Admin).is_admin());
        assert!(user_with(UserRole::Student).is_student());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let mut user = user_with(UserRole::Student);
        user.hashed_password = "$argon2id$secret".to_string();
        let json = serde_json::to_value(&user).expect("serialize");
        assert!(json.get("hashed_password").is_none());
    }
}
