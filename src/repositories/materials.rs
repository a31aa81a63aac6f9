use sqlx::PgPool;

use crate::db::models::Material;
use crate::db::types::MaterialType;

const MATERIAL_COLUMNS: &str =
    "id, title, content, file_path, material_type, uploaded_by, uploaded_at";

pub(crate) struct CreateMaterial<'a> {
    pub(crate) title: &'a str,
    pub(crate) content: &'a str,
    pub(crate) file_path: Option<&'a str>,
    pub(crate) material_type: MaterialType,
    pub(crate) uploaded_by: i64,
    pub(crate) uploaded_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateMaterial {
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) file_path: Option<String>,
    pub(crate) material_type: Option<MaterialType>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateMaterial<'_>,
) -> Result<Material, sqlx::Error> {
    sqlx::query_as::<_, Material>(&format!(
        "INSERT INTO materials (
            title, content, file_path, material_type, uploaded_by, uploaded_at
         ) VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {MATERIAL_COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.content)
    .bind(params.file_path)
    .bind(params.material_type)
    .bind(params.uploaded_by)
    .bind(params.uploaded_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    material_id: i64,
) -> Result<Option<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
    ))
    .bind(material_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(&format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY id"))
        .fetch_all(pool)
        .await
}

/// Stored files of every material uploaded by `user_id`.
pub(crate) async fn file_paths_by_uploader(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT file_path FROM materials WHERE uploaded_by = $1 AND file_path IS NOT NULL",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    material_id: i64,
    params: UpdateMaterial,
) -> Result<Option<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET
            title = COALESCE($1, title),
            content = COALESCE($2, content),
            file_path = COALESCE($3, file_path),
            material_type = COALESCE($4, material_type)
         WHERE id = $5
         RETURNING {MATERIAL_COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.content)
    .bind(params.file_path)
    .bind(params.material_type)
    .bind(material_id)
    .fetch_optional(pool)
    .await
}

/// Deletes the row (module links go with it) and hands back what was removed.
pub(crate) async fn delete(
    pool: &PgPool,
    material_id: i64,
) -> Result<Option<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(&format!(
        "DELETE FROM materials WHERE id = $1 RETURNING {MATERIAL_COLUMNS}"
    ))
    .bind(material_id)
    .fetch_optional(pool)
    .await
}
