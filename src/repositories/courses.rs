use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Course;
use crate::repositories::listing::{self, SortKey};

const COURSE_COLUMNS: &str = "id, title, description, teacher_id, created_at, updated_at";

pub(crate) const ORDERING_FIELDS: &[(&str, &str)] =
    &[("title", "title"), ("created_at", "created_at")];

pub(crate) struct CreateCourse<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) teacher_id: i64,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateCourse {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Default)]
pub(crate) struct ListCourses {
    pub(crate) title: Option<String>,
    pub(crate) teacher_id: Option<i64>,
    pub(crate) search: Vec<String>,
    pub(crate) ordering: Vec<SortKey>,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (title, description, teacher_id, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4)
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.teacher_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, course_id: i64) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists(pool: &PgPool, course_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
        .bind(course_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list(pool: &PgPool, params: ListCourses) -> Result<Vec<Course>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COURSE_COLUMNS} FROM courses WHERE TRUE"));

    if let Some(title) = params.title {
        builder.push(" AND title = ");
        builder.push_bind(title);
    }
    if let Some(teacher_id) = params.teacher_id {
        builder.push(" AND teacher_id = ");
        builder.push_bind(teacher_id);
    }
    listing::push_search(&mut builder, &["title", "description"], params.search);
    listing::push_order_by(&mut builder, &params.ordering, "id ASC");

    builder.build_query_as::<Course>().fetch_all(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    course_id: i64,
    params: UpdateCourse,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            updated_at = $3
         WHERE id = $4
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.updated_at)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, course_id: i64) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM courses WHERE id = $1").bind(course_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
