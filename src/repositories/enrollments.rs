//! Every query here is scoped to one student; rows of other students are
//! indistinguishable from missing ones.

use sqlx::PgPool;

use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

const ENROLLMENT_COLUMNS: &str = "id, student_id, module_id, enrolled_at, progress, status";

pub(crate) struct CreateEnrollment {
    pub(crate) student_id: i64,
    pub(crate) module_id: i64,
    pub(crate) progress: f64,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateEnrollment {
    pub(crate) module_id: Option<i64>,
    pub(crate) progress: Option<f64>,
    pub(crate) status: Option<EnrollmentStatus>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateEnrollment,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (student_id, module_id, enrolled_at, progress, status)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {ENROLLMENT_COLUMNS}",
    ))
    .bind(params.student_id)
    .bind(params.module_id)
    .bind(params.enrolled_at)
    .bind(params.progress)
    .bind(params.status)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: i64,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student_id = $1 ORDER BY id"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_for_student(
    pool: &PgPool,
    enrollment_id: i64,
    student_id: i64,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1 AND student_id = $2"
    ))
    .bind(enrollment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn update_for_student(
    pool: &PgPool,
    enrollment_id: i64,
    student_id: i64,
    params: UpdateEnrollment,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET
            module_id = COALESCE($1, module_id),
            progress = COALESCE($2, progress),
            status = COALESCE($3, status)
         WHERE id = $4 AND student_id = $5
         RETURNING {ENROLLMENT_COLUMNS}",
    ))
    .bind(params.module_id)
    .bind(params.progress)
    .bind(params.status)
    .bind(enrollment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_for_student(
    pool: &PgPool,
    enrollment_id: i64,
    student_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM enrollments WHERE id = $1 AND student_id = $2")
        .bind(enrollment_id)
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
