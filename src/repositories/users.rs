use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{User, UserProfile};
use crate::db::types::UserRole;

const COLUMNS: &str =
    "id, username, email, hashed_password, role, is_active, created_at, updated_at";

const PROFILE_SELECT: &str = "\
    SELECT u.id, u.username, u.email, u.hashed_password, u.role, u.is_active, \
           u.created_at, u.updated_at, \
           ARRAY(SELECT c.id FROM courses c WHERE c.teacher_id = u.id ORDER BY c.id) \
               AS authored_courses, \
           ARRAY(SELECT m.id FROM educational_modules m WHERE m.author_id = u.id ORDER BY m.id) \
               AS authored_modules, \
           ARRAY(SELECT e.module_id FROM enrollments e WHERE e.student_id = u.id ORDER BY e.id) \
               AS enrolled_modules \
    FROM users u";

pub(crate) async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_profile(
    pool: &PgPool,
    id: i64,
) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(&format!("{PROFILE_SELECT} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_profiles(
    pool: &PgPool,
    role: Option<UserRole>,
) -> Result<Vec<UserProfile>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(PROFILE_SELECT);
    if let Some(role) = role {
        builder.push(" WHERE u.role = ");
        builder.push_bind(role);
    }
    builder.push(" ORDER BY u.id");

    builder.build_query_as::<UserProfile>().fetch_all(pool).await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) username: &'a str,
    pub(crate) email: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            username, email, hashed_password, role, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        RETURNING {COLUMNS}",
    ))
    .bind(params.username)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateUser {
    pub(crate) username: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) role: Option<UserRole>,
    pub(crate) is_active: Option<bool>,
    pub(crate) hashed_password: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Returns `false` when no row has `id`.
pub(crate) async fn update(pool: &PgPool, id: i64, params: UpdateUser) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET
            username = COALESCE($1, username),
            email = COALESCE($2, email),
            role = COALESCE($3, role),
            is_active = COALESCE($4, is_active),
            hashed_password = COALESCE($5, hashed_password),
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.username)
    .bind(params.email)
    .bind(params.role)
    .bind(params.is_active)
    .bind(params.hashed_password)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
